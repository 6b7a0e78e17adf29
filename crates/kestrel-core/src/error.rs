//! Unified error types for the cache facade and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Kestrel.
///
/// Connection-level failures and command-level failures are kept apart so
/// callers can tell "the store is gone" from "the store said no".
#[derive(Error, Debug)]
pub enum KestrelError {
    // ============ Store Errors ============
    /// Pool exhausted, wait timed out, or the store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store rejected a command (wrong type, non-numeric counter, ...).
    #[error("Store error: {0}")]
    Store(String),

    // ============ Codec Errors ============
    /// A value could not be encoded, or a stored string could not be decoded
    /// into the requested kind.
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Setup Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KestrelError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Store(_) => "STORE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a store-unavailable error.
    #[must_use]
    pub fn unavailable<T: Into<String>>(message: T) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Creates a store command error.
    #[must_use]
    pub fn store<T: Into<String>>(message: T) -> Self {
        Self::Store(message.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization<T: Into<String>>(message: T) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable.
    ///
    /// Only connection-level failures qualify; a rejected command or a
    /// malformed stored value fails the same way on every attempt.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<serde_json::Error> for KestrelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for KestrelError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::Store(err.to_string())
        }
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for KestrelError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        match err {
            deadpool_redis::PoolError::Backend(e) => Self::from(e),
            other => Self::StoreUnavailable(format!("Failed to get Redis connection: {}", other)),
        }
    }
}

/// Serializable error summary, suitable for logs and health payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Whether retrying the operation may succeed
    pub retriable: bool,
}

impl From<&KestrelError> for ErrorSummary {
    fn from(error: &KestrelError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            retriable: error.is_retriable(),
        }
    }
}
