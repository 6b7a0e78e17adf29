//! Key namespaces and their expiry policy.

use kestrel_core::{KestrelError, KestrelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable key namespace with an expiry policy.
///
/// Every key handed to [`CacheService`](crate::CacheService) is a bare key;
/// the store sees `prefix + key`. An `expire_seconds` of zero or less means
/// entries written under this namespace never expire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPrefix {
    prefix: String,
    expire_seconds: i64,
}

impl KeyPrefix {
    /// Creates a namespace with the given prefix and expiry.
    #[must_use]
    pub fn new(prefix: impl Into<String>, expire_seconds: i64) -> Self {
        Self {
            prefix: prefix.into(),
            expire_seconds,
        }
    }

    /// Creates a namespace whose entries never expire.
    #[must_use]
    pub fn persistent(prefix: impl Into<String>) -> Self {
        Self::new(prefix, 0)
    }

    /// Creates a `{family}:{name}` namespace, e.g. `UserKey:id`.
    #[must_use]
    pub fn namespaced(family: &str, name: &str, expire_seconds: i64) -> Self {
        Self::new(format!("{}:{}", family, name), expire_seconds)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn expire_seconds(&self) -> i64 {
        self.expire_seconds
    }

    /// Returns the TTL to write with, or `None` for persistent namespaces.
    #[must_use]
    pub fn ttl_seconds(&self) -> Option<u64> {
        u64::try_from(self.expire_seconds).ok().filter(|secs| *secs > 0)
    }

    /// Returns the store-visible key for `key`.
    #[must_use]
    pub fn real_key(&self, key: &str) -> String {
        let mut real = String::with_capacity(self.prefix.len() + key.len());
        real.push_str(&self.prefix);
        real.push_str(key);
        real
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// Checks that no prefix in `prefixes` is a string prefix of another.
///
/// Overlapping namespaces share key space: a key written under `user:` is
/// indistinguishable from one written under `user:id` with a matching
/// suffix, and bulk deletion of one namespace would reach into the other.
pub fn ensure_disjoint(prefixes: &[KeyPrefix]) -> KestrelResult<()> {
    for (i, a) in prefixes.iter().enumerate() {
        for b in &prefixes[i + 1..] {
            if a.prefix.starts_with(&b.prefix) || b.prefix.starts_with(&a.prefix) {
                return Err(KestrelError::Configuration(format!(
                    "Key prefixes '{}' and '{}' overlap",
                    a.prefix, b.prefix
                )));
            }
        }
    }
    Ok(())
}
