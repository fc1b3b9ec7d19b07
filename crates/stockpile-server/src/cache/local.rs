//! In-process cache backed by a `DashMap`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;

use super::{CacheError, CacheStore};

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` so hits clone a pointer, not the bytes.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Single-instance cache. Expired entries are dropped lazily on access and
/// on every key enumeration.
#[derive(Clone, Debug, Default)]
pub struct LocalCache {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    fn matching_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let matcher = glob_to_regex(pattern)?;
        self.purge_expired();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| matcher.is_match(e.key()))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Compiles a Redis-style glob (`*`, `?`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl CacheStore for LocalCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.data.as_ref().clone()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut removed = 0u64;
        for key in self.matching_keys(pattern)? {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.matching_keys(pattern)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
