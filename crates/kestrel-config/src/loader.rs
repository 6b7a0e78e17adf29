//! Configuration loader with layered sources.

use crate::CacheConfig;
use config::{Config, ConfigError, Environment, File};
use kestrel_core::KestrelError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const REDIS_SCHEMES: &[&str] = &["redis", "rediss", "unix", "redis+unix"];

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<CacheConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{config_dir}/default.toml` - Default values
    /// 2. `{config_dir}/{environment}.toml` - Environment-specific overrides
    /// 3. `{config_dir}/local.toml` - Local overrides
    /// 4. Environment variables with `KESTREL__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, KestrelError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, KestrelError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> CacheConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), KestrelError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &str) -> Result<CacheConfig, KestrelError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("KESTREL_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("KESTREL")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_kestrel_error)?;

        let mut cache_config: CacheConfig = config
            .try_deserialize()
            .map_err(config_error_to_kestrel_error)?;
        cache_config.app.environment = environment;

        validate_config(&cache_config)?;

        Ok(cache_config)
    }
}

/// Validates a configuration.
pub fn validate_config(config: &CacheConfig) -> Result<(), KestrelError> {
    let url = url::Url::parse(&config.redis.url).map_err(|e| {
        KestrelError::Configuration(format!("Invalid Redis URL '{}': {}", config.redis.url, e))
    })?;
    if !REDIS_SCHEMES.contains(&url.scheme()) {
        return Err(KestrelError::Configuration(format!(
            "Unsupported Redis URL scheme '{}'",
            url.scheme()
        )));
    }

    if config.redis.pool_size == 0 {
        return Err(KestrelError::Configuration(
            "Redis pool size must be at least 1".to_string(),
        ));
    }

    if config.scan.batch_size == 0 {
        return Err(KestrelError::Configuration(
            "Scan batch size must be at least 1".to_string(),
        ));
    }

    if config.app.environment == "production" && config.redis.wait_timeout_secs.is_none() {
        warn!("No Redis pool wait timeout configured; callers may block indefinitely");
    }

    Ok(())
}

fn config_error_to_kestrel_error(err: ConfigError) -> KestrelError {
    KestrelError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CacheConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_non_redis_url() {
        let mut config = CacheConfig::default();
        config.redis.url = "http://localhost:6379".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut config = CacheConfig::default();
        config.scan.batch_size = 0;
        assert!(matches!(validate_config(&config), Err(KestrelError::Configuration(_))));
    }

    #[test]
    fn test_rejects_zero_pool_size() {
        let mut config = CacheConfig::default();
        config.redis.pool_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_loads_default_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[redis]\nurl = \"redis://cache.internal:6380/2\"\npool_size = 32\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path().to_string_lossy().to_string()).unwrap();
        let config = loader.get().await;
        assert_eq!(config.redis.url, "redis://cache.internal:6380/2");
        assert_eq!(config.redis.pool_size, 32);
    }

    #[tokio::test]
    async fn test_local_overrides_default_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[redis]\npool_size = 8\n").unwrap();

        let loader = ConfigLoader::new(dir.path().to_string_lossy().to_string()).unwrap();
        assert_eq!(loader.get().await.redis.pool_size, 8);

        fs::write(dir.path().join("local.toml"), "[redis]\npool_size = 3\n").unwrap();
        loader.reload().await.unwrap();
        assert_eq!(loader.get().await.redis.pool_size, 3);
    }

    #[test]
    fn test_invalid_file_value_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[scan]\nbatch_size = 0\n").unwrap();

        let result = ConfigLoader::new(dir.path().to_string_lossy().to_string());
        assert!(matches!(result, Err(KestrelError::Configuration(_))));
    }
}
