//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; binaries and test harnesses that
//! embed Kestrel call [`init_tracing`] once at startup to decide where those
//! events go.

use crate::{KestrelError, KestrelResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Whether to include the event target (module path) in output.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_log_level() -> String {
    "info,kestrel=debug".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            with_target: default_with_target(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Fails with
/// [`KestrelError::Internal`] if a global subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> KestrelResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            KestrelError::Configuration(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(config.with_target))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
    };

    result.map_err(|e| KestrelError::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(
        log_level = %config.log_level,
        log_format = ?config.log_format,
        "Tracing initialized"
    );
    Ok(())
}
