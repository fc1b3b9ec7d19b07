pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod repository;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

pub use cache::{CacheError, CacheStore, DynCacheStore, LocalCache, RedisCache};
pub use config::{AppConfig, CacheConfig, PostgresStorageConfig, RedisConfig, ServerConfig};
pub use observability::init_tracing;
pub use repository::{CacheAdmin, CachedRepository, RepositoryError};
pub use server::{AppState, ServerBuilder, StockpileServer, build_app};

/// Create a cache store based on configuration.
///
/// ## Cache Modes
///
/// - **Redis disabled**: Returns a local in-process cache
/// - **Redis enabled**: Connects to Redis, falls back to local on failure
///
/// ## Graceful Degradation
///
/// If the Redis pool cannot be created or does not answer `PING` at startup,
/// the service runs on the local cache instead of refusing to start.
pub async fn create_cache_store(config: &RedisConfig) -> DynCacheStore {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return Arc::new(LocalCache::new());
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let timeout = Duration::from_millis(config.timeout_ms);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return Arc::new(LocalCache::new());
        }
    };

    let cache = RedisCache::new(pool, config.timeout());
    match cache.ping().await {
        Ok(()) => {
            tracing::info!("✓ Connected to Redis successfully");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            Arc::new(LocalCache::new())
        }
    }
}
