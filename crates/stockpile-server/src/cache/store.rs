use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::CacheError;

/// Shared handle to a cache client.
pub type DynCacheStore = Arc<dyn CacheStore>;

/// Operations the service needs from a key-value cache.
///
/// Values are opaque bytes. Patterns are globs where `*` matches any run of
/// characters and `?` matches exactly one.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration)
    -> Result<(), CacheError>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every key matching `pattern` and returns how many were removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Lists live keys matching `pattern`, sorted.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Removes every entry.
    async fn flush_all(&self) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend identifier, e.g. `redis`.
    fn backend_name(&self) -> &'static str;
}
