//! The document store contract.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::StoredDocument;

/// The storage trait every document store backend implements.
///
/// Documents live in named collections and are keyed by a store-assigned
/// identifier. Implementations must be thread-safe (`Send + Sync`); a single
/// instance is shared by all concurrent requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every document of a collection in insertion order.
    ///
    /// A collection that was never written to is empty, not an error.
    async fn find_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StorageError>;

    /// Reads one document by identifier.
    ///
    /// Returns `None` if the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing documents.
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StorageError>;

    /// Inserts a document and returns its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidDocument` if `fields` is not a JSON object.
    async fn insert(&self, collection: &str, fields: &Value) -> Result<String, StorageError>;

    /// Sets the top-level fields in `fields` on an existing document.
    ///
    /// Returns the number of matched documents (0 or 1).
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        fields: &Value,
    ) -> Result<u64, StorageError>;

    /// Deletes one document. Returns the number of deleted documents (0 or 1).
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<u64, StorageError>;

    /// Number of documents in a collection.
    async fn count(&self, collection: &str) -> Result<u64, StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Rejects documents whose body is not a JSON object.
pub fn ensure_object(fields: &Value) -> Result<(), StorageError> {
    if fields.is_object() {
        Ok(())
    } else {
        Err(StorageError::invalid_document(
            "document body must be a JSON object",
        ))
    }
}
