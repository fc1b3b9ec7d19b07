//! Redis cache client on a `deadpool-redis` pool.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::{AsyncCommands, RedisError};

use super::{CacheError, CacheStore};

/// Cache backed by a shared Redis server.
///
/// Every command is bounded by `timeout`; pool acquisition is bounded by the
/// pool's own wait timeout.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    timeout: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("status", &self.pool.status())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisCache {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::unavailable(e.to_string()))
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, RedisError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::command(op, e.to_string())),
            Err(_) => Err(CacheError::Timeout {
                op,
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn().await?;
        self.run("get", conn.get::<_, Option<Vec<u8>>>(key)).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        // PSETEX rejects 0; round sub-millisecond TTLs up.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn().await?;
        self.run("set", conn.pset_ex::<_, _, ()>(key, value, millis))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        self.run("del", conn.del::<_, ()>(key)).await
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = self.run("keys", conn.keys(pattern)).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.run("del", conn.del::<_, u64>(keys)).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn().await?;
        let mut keys: Vec<String> = self.run("keys", conn.keys(pattern)).await?;
        keys.sort();
        Ok(keys)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        self.run("flushall", redis::cmd("FLUSHALL").query_async(&mut conn))
            .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _pong: String = self
            .run("ping", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
