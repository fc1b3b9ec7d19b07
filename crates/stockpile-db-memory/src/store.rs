use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use stockpile_storage::{DocumentStore, StorageError, StoredDocument, ensure_object};

pub type StorageKey = String; // Format: "collection/id"

fn make_storage_key(collection: &str, id: &str) -> StorageKey {
    format!("{collection}/{id}")
}

#[derive(Debug, Clone)]
struct Entry {
    /// Insertion sequence, used to list a collection in insertion order.
    seq: u64,
    doc: StoredDocument,
}

/// In-memory document store backed by a concurrent hash map.
///
/// Every operation touches a single map entry, so concurrent requests never
/// block each other beyond the shard lock of the key they use.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: DashMap<StorageKey, Entry>,
    seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of documents across all collections.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StorageError> {
        let prefix = format!("{collection}/");
        let mut entries: Vec<Entry> = self
            .data
            .iter()
            .filter(|item| item.key().starts_with(&prefix))
            .map(|item| item.value().clone())
            .collect();
        entries.sort_by_key(|e| e.seq);
        Ok(entries.into_iter().map(|e| e.doc).collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StorageError> {
        let key = make_storage_key(collection, id);
        Ok(self.data.get(&key).map(|e| e.doc.clone()))
    }

    async fn insert(&self, collection: &str, fields: &Value) -> Result<String, StorageError> {
        ensure_object(fields)?;
        let id = stockpile_core::generate_id();
        let entry = Entry {
            seq: self.next_seq(),
            doc: StoredDocument::new(id.clone(), fields.clone()),
        };
        self.data.insert(make_storage_key(collection, &id), entry);
        Ok(id)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        fields: &Value,
    ) -> Result<u64, StorageError> {
        ensure_object(fields)?;
        let key = make_storage_key(collection, id);
        match self.data.get_mut(&key) {
            Some(mut entry) => {
                entry.doc.apply_update(fields);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<u64, StorageError> {
        let key = make_storage_key(collection, id);
        Ok(u64::from(self.data.remove(&key).is_some()))
    }

    async fn count(&self, collection: &str) -> Result<u64, StorageError> {
        let prefix = format!("{collection}/");
        let n = self
            .data
            .iter()
            .filter(|item| item.key().starts_with(&prefix))
            .count();
        Ok(n as u64)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
