//! Key-value cache clients.
//!
//! ## Backends
//!
//! - **Redis**: shared across instances, entries expire server-side
//! - **Local**: in-process `DashMap`, entries expire on access
//!
//! ## Graceful Degradation
//!
//! If Redis is disabled or unreachable at startup the service falls back to
//! the local backend (see [`crate::create_cache_store`]). Failures after
//! startup surface as [`CacheError`] and are absorbed by the coordinator.

pub mod local;
pub mod redis_cache;
pub mod store;

use std::time::Duration;

use thiserror::Error;

pub use local::{CachedEntry, LocalCache};
pub use redis_cache::RedisCache;
pub use store::{CacheStore, DynCacheStore};

/// Errors raised by a cache client.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No connection could be obtained.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// The server rejected or failed a command.
    #[error("cache command {op} failed: {message}")]
    Command { op: &'static str, message: String },

    /// A command did not answer in time.
    #[error("cache command {op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// A key pattern could not be compiled.
    #[error("invalid key pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn command(op: &'static str, message: impl Into<String>) -> Self {
        Self::Command {
            op,
            message: message.into(),
        }
    }
}
