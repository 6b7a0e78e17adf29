//! Application configuration structures.

use kestrel_core::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Redis connection pool configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Prefix scan configuration.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "kestrel".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Maximum number of pooled connections.
    pub pool_size: usize,
    /// How long a caller may wait for a free connection. `None` waits forever.
    pub wait_timeout_secs: Option<u64>,
    /// Verify the pool with a `PING` when it is created.
    pub ping_on_startup: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            wait_timeout_secs: None,
            ping_on_startup: true,
        }
    }
}

impl RedisConfig {
    /// Returns the pool wait timeout as a `Duration`.
    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_secs.map(Duration::from_secs)
    }
}

/// Prefix scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// `COUNT` hint sent with every `SCAN` round.
    pub batch_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}
