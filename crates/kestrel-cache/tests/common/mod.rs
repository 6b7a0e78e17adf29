//! Common test infrastructure for Redis integration tests.

use kestrel_cache::{CacheService, RedisPool};
use kestrel_config::RedisConfig;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// Test Redis container wrapper.
///
/// Manages a Redis testcontainer lifecycle and provides a pooled cache.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    pool: RedisPool,
}

impl TestRedis {
    /// Starts a fresh Redis container and connects a small pool to it.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = RedisConfig {
            url: format!("redis://127.0.0.1:{}", port),
            pool_size: 4,
            wait_timeout_secs: Some(5),
            ping_on_startup: true,
        };

        let pool = Self::connect_with_retry(&config, 30).await;

        Self {
            _container: container,
            pool,
        }
    }

    /// Returns a cache service over the container's pool.
    pub fn cache(&self) -> CacheService<RedisPool> {
        CacheService::new(self.pool.clone())
    }

    async fn connect_with_retry(config: &RedisConfig, max_attempts: u32) -> RedisPool {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match RedisPool::from_config(config).await {
                Ok(pool) => return pool,
                Err(e) => {
                    if attempts >= max_attempts {
                        panic!("Failed to connect to Redis after {} attempts: {}", max_attempts, e);
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
}
