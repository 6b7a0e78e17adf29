//! Redis store backed by a `deadpool-redis` pool.

use super::{ConnectionSource, StoreConnection};
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use kestrel_config::RedisConfig;
use kestrel_core::{KestrelError, KestrelResult};
use tracing::info;

/// Pooled Redis connections.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl RedisPool {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Builds a pool from configuration, verifying it with `PING` when
    /// `ping_on_startup` is set.
    pub async fn from_config(config: &RedisConfig) -> KestrelResult<Self> {
        info!(pool_size = config.pool_size, "Creating Redis connection pool...");

        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| KestrelError::Configuration(format!("Invalid Redis config: {}", e)))?
            .max_size(config.pool_size)
            .wait_timeout(config.wait_timeout())
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| KestrelError::Configuration(format!("Failed to create Redis pool: {}", e)))?;

        let pool = Self::new(pool);
        if config.ping_on_startup {
            pool.ping().await?;
        }

        info!("Redis connection pool created successfully");
        Ok(pool)
    }

    /// Round-trips a `PING` on a pooled connection.
    pub async fn ping(&self) -> KestrelResult<()> {
        let mut conn = self.pool.get().await?;
        redis::cmd("PING").query_async::<String>(&mut *conn).await?;
        Ok(())
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn inner(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionSource for RedisPool {
    type Connection = RedisConnection;

    async fn acquire(&self) -> KestrelResult<RedisConnection> {
        let conn = self.pool.get().await?;
        Ok(RedisConnection { conn })
    }
}

/// A Redis connection checked out of [`RedisPool`].
///
/// Returned to the pool when dropped.
pub struct RedisConnection {
    conn: deadpool_redis::Connection,
}

#[async_trait]
impl StoreConnection for RedisConnection {
    async fn get(&mut self, key: &str) -> KestrelResult<Option<String>> {
        let value: Option<String> = self.conn.get(key).await?;
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: &str) -> KestrelResult<()> {
        self.conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn set_ex(&mut self, key: &str, value: &str, seconds: u64) -> KestrelResult<()> {
        self.conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn del(&mut self, keys: &[String]) -> KestrelResult<u64> {
        let deleted: u64 = self.conn.del(keys).await?;
        Ok(deleted)
    }

    async fn exists(&mut self, key: &str) -> KestrelResult<bool> {
        let exists: bool = self.conn.exists(key).await?;
        Ok(exists)
    }

    async fn incr(&mut self, key: &str) -> KestrelResult<i64> {
        Ok(redis::cmd("INCR").arg(key).query_async(&mut *self.conn).await?)
    }

    async fn decr(&mut self, key: &str) -> KestrelResult<i64> {
        Ok(redis::cmd("DECR").arg(key).query_async(&mut *self.conn).await?)
    }

    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> KestrelResult<(u64, Vec<String>)> {
        Ok(redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut *self.conn)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_redis_url() {
        let config = RedisConfig {
            url: "http://localhost:6379".to_string(),
            ..RedisConfig::default()
        };
        let result = RedisPool::from_config(&config).await;
        assert!(matches!(result, Err(KestrelError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_builds_lazily_without_ping() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 3,
            wait_timeout_secs: Some(1),
            ping_on_startup: false,
        };
        let pool = RedisPool::from_config(&config).await.unwrap();
        assert_eq!(pool.inner().status().max_size, 3);
    }
}
