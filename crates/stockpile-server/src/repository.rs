//! Cache-aside coordination between the document store and the cache.
//!
//! Reads go to the cache first and populate it from the store on a miss.
//! Writes go to the store and then invalidate the affected keys; the cache is
//! never written on the write path.
//!
//! The cache is best-effort: any cache failure on a CRUD path is logged,
//! counted and otherwise ignored, so the store alone decides the outcome of a
//! request. A read that misses, loads from the store, and populates after a
//! concurrent write has already invalidated the same key leaves a stale entry
//! behind; it is served until the TTL expires.

use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stockpile_api::{CacheStats, Sourced};
use stockpile_core::{
    CREATED_AT_FIELD, CoreError, IdError, Resource, UPDATED_AT_FIELD, Validate, ValidationError,
    validate_id,
};
use stockpile_storage::{DynDocumentStore, StorageError};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheError, DynCacheStore};
use crate::metrics;

/// Failures of a coordinator operation. Cache failures never appear here.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid id: {0}")]
    InvalidId(#[from] IdError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A stored document no longer decodes as its resource kind.
    #[error(transparent)]
    Corrupt(#[from] CoreError),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl RepositoryError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Cache-aside repository for one resource kind.
pub struct CachedRepository<R> {
    store: DynDocumentStore,
    cache: DynCacheStore,
    ttl: Duration,
    _kind: PhantomData<fn() -> R>,
}

impl<R> Clone for CachedRepository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            ttl: self.ttl,
            _kind: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for CachedRepository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedRepository")
            .field("store", &self.store.backend_name())
            .field("cache", &self.cache.backend_name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<R: Resource> CachedRepository<R> {
    pub fn new(store: DynDocumentStore, cache: DynCacheStore, ttl: Duration) -> Self {
        Self {
            store,
            cache,
            ttl,
            _kind: PhantomData,
        }
    }

    /// Lists every record of this kind.
    #[instrument(skip(self), fields(kind = R::KIND))]
    pub async fn get_all(&self) -> Result<Sourced<Vec<R>>> {
        let key = R::collection_cache_key();
        if let Some(records) = self.lookup::<Vec<R>>(&key).await {
            return Ok(Sourced::cache(records));
        }

        let records = self
            .store
            .find_all(R::COLLECTION)
            .await?
            .into_iter()
            .map(|doc| R::from_document(&doc.id, doc.fields))
            .collect::<std::result::Result<Vec<R>, CoreError>>()?;

        self.populate(&key, &records).await;
        Ok(Sourced::database(records))
    }

    /// Fetches one record. Absent records are not cached.
    #[instrument(skip(self), fields(kind = R::KIND))]
    pub async fn get_by_id(&self, id: &str) -> Result<Sourced<R>> {
        validate_id(id)?;
        let key = R::cache_key(id);
        if let Some(record) = self.lookup::<R>(&key).await {
            return Ok(Sourced::cache(record));
        }

        let doc = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(R::KIND, id))?;
        let record = R::from_document(&doc.id, doc.fields)?;

        self.populate(&key, &record).await;
        Ok(Sourced::database(record))
    }

    /// Inserts a record and invalidates the collection key.
    #[instrument(skip(self, input), fields(kind = R::KIND))]
    pub async fn create(&self, input: &R::Input) -> Result<R> {
        input.validate()?;
        let fields = stamped_fields(input, CREATED_AT_FIELD)?;

        let id = self.store.insert(R::COLLECTION, &fields).await?;
        let record = R::from_document(&id, fields)?;

        self.invalidate(&R::collection_cache_key()).await;
        Ok(record)
    }

    /// Replaces the attribute fields of a record and invalidates its keys.
    #[instrument(skip(self, input), fields(kind = R::KIND))]
    pub async fn update(&self, id: &str, input: &R::Input) -> Result<()> {
        validate_id(id)?;
        input.validate()?;
        let fields = stamped_fields(input, UPDATED_AT_FIELD)?;

        let matched = self.store.update_by_id(R::COLLECTION, id, &fields).await?;
        if matched == 0 {
            return Err(RepositoryError::not_found(R::KIND, id));
        }

        self.invalidate(&R::cache_key(id)).await;
        self.invalidate(&R::collection_cache_key()).await;
        Ok(())
    }

    /// Removes a record and invalidates its keys.
    #[instrument(skip(self), fields(kind = R::KIND))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        validate_id(id)?;

        let deleted = self.store.delete_by_id(R::COLLECTION, id).await?;
        if deleted == 0 {
            return Err(RepositoryError::not_found(R::KIND, id));
        }

        self.invalidate(&R::cache_key(id)).await;
        self.invalidate(&R::collection_cache_key()).await;
        Ok(())
    }

    /// Drops the collection key. Used after writes that bypass the coordinator.
    pub async fn invalidate_collection(&self) {
        self.invalidate(&R::collection_cache_key()).await;
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    metrics::record_cache_hit(R::KIND);
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "discarding undecodable cache entry");
                    self.invalidate(key).await;
                    metrics::record_cache_miss(R::KIND);
                    None
                }
            },
            Ok(None) => {
                debug!(key, "cache miss");
                metrics::record_cache_miss(R::KIND);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "cache lookup failed, reading from store");
                metrics::record_cache_error("get");
                metrics::record_cache_miss(R::KIND);
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache entry");
                return;
            }
        };
        match self.cache.set_with_ttl(key, bytes, self.ttl).await {
            Ok(()) => debug!(key, ttl_secs = self.ttl.as_secs(), "cache populated"),
            Err(e) => {
                warn!(key, error = %e, "cache write-back failed");
                metrics::record_cache_error("set");
            }
        }
    }

    async fn invalidate(&self, key: &str) {
        match self.cache.delete(key).await {
            Ok(()) => debug!(key, "cache invalidated"),
            Err(e) => {
                warn!(key, error = %e, "cache invalidation failed");
                metrics::record_cache_error("delete");
            }
        }
    }
}

/// Serializes a write payload and stamps `field` with the current time.
pub(crate) fn stamped_fields<I: Serialize>(input: &I, field: &str) -> Result<Value> {
    let mut fields = serde_json::to_value(input)?;
    let now = OffsetDateTime::now_utc().format(&Rfc3339)?;
    if let Value::Object(map) = &mut fields {
        map.insert(field.to_string(), Value::String(now));
    }
    Ok(fields)
}

/// Administrative access to the whole cache. Unlike the CRUD paths, cache
/// failures are returned to the caller since there is nothing to fall back to.
#[derive(Clone)]
pub struct CacheAdmin {
    cache: DynCacheStore,
}

impl CacheAdmin {
    pub fn new(cache: DynCacheStore) -> Self {
        Self { cache }
    }

    pub fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> std::result::Result<CacheStats, CacheError> {
        let keys = self.cache.keys("*").await?;
        Ok(CacheStats {
            total_keys: keys.len(),
            keys,
        })
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> std::result::Result<(), CacheError> {
        self.cache.flush_all().await?;
        tracing::info!(backend = self.cache.backend_name(), "cache flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::{Product, ProductInput};

    #[test]
    fn stamped_fields_adds_timestamp() {
        let input = ProductInput {
            name: "Pen".into(),
            price: 1.5,
            stock: 100,
        };
        let fields = stamped_fields(&input, CREATED_AT_FIELD).unwrap();
        assert_eq!(fields["name"], "Pen");
        let stamp = fields[CREATED_AT_FIELD].as_str().unwrap();
        assert!(OffsetDateTime::parse(stamp, &Rfc3339).is_ok());
        assert!(fields.get(UPDATED_AT_FIELD).is_none());

        // The stamped body decodes back into a record.
        let product = Product::from_document("p1", fields).unwrap();
        assert!(product.created_at.is_some());
    }

    #[test]
    fn not_found_message_names_the_kind() {
        let err = RepositoryError::not_found("product", "42");
        assert_eq!(err.to_string(), "product not found");
        assert!(err.is_not_found());
        assert!(!RepositoryError::from(StorageError::internal("boom")).is_not_found());
    }
}
