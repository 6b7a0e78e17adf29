//! Namespaced, TTL-aware cache facade.

use crate::codec::{CacheDecode, CacheEncode, Json};
use crate::prefix::KeyPrefix;
use crate::scanner::PatternScanner;
use crate::scope::ConnectionScope;
use crate::store::{ConnectionSource, RedisPool, StoreConnection};
use kestrel_config::CacheConfig;
use kestrel_core::KestrelResult;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed cache operations over a pooled store.
///
/// Every operation takes a [`KeyPrefix`] and a bare key and checks out its
/// own connection for its duration, so a `CacheService` can be cloned and
/// shared freely across tasks. Single-key operations are atomic at the
/// store; [`delete_by_prefix`](Self::delete_by_prefix) is not.
pub struct CacheService<S: ConnectionSource = RedisPool> {
    source: Arc<S>,
    scanner: PatternScanner,
}

impl<S: ConnectionSource> Clone for CacheService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            scanner: self.scanner,
        }
    }
}

impl CacheService<RedisPool> {
    /// Builds a Redis-backed service from configuration.
    pub async fn from_config(config: &CacheConfig) -> KestrelResult<Self> {
        let pool = RedisPool::from_config(&config.redis).await?;
        Ok(Self::new(pool).with_scan_batch_size(config.scan.batch_size))
    }
}

impl<S: ConnectionSource> CacheService<S> {
    /// Creates a service over `source`.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Creates a service over a source shared with other owners.
    #[must_use]
    pub fn from_shared(source: Arc<S>) -> Self {
        Self {
            source,
            scanner: PatternScanner::default(),
        }
    }

    /// Sets the `COUNT` hint used by prefix scans.
    #[must_use]
    pub fn with_scan_batch_size(mut self, batch_size: usize) -> Self {
        self.scanner = PatternScanner::new(batch_size);
        self
    }

    /// Returns the connection source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    async fn scope(&self, operation: &'static str) -> KestrelResult<ConnectionScope<S::Connection>> {
        ConnectionScope::open(&*self.source, operation).await
    }

    /// Reads and decodes the value at `prefix + key`.
    ///
    /// A missing key (or a stored empty string) yields `Ok(None)`. A stored
    /// value that does not decode as `T` is a
    /// [`Serialization`](kestrel_core::KestrelError::Serialization) error.
    pub async fn get<T: CacheDecode>(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<Option<T>> {
        let real_key = prefix.real_key(key);
        let raw = {
            let mut conn = self.scope("get").await?;
            conn.get(&real_key).await?
        };

        match raw.filter(|raw| !raw.is_empty()) {
            Some(raw) => {
                debug!(key = %real_key, "Cache hit");
                T::decode(&raw).map(Some)
            }
            None => {
                debug!(key = %real_key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Reads an `i64` value.
    pub async fn get_i64(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<Option<i64>> {
        self.get(prefix, key).await
    }

    /// Reads an `i32` value.
    pub async fn get_i32(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<Option<i32>> {
        self.get(prefix, key).await
    }

    /// Reads a string value.
    pub async fn get_string(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<Option<String>> {
        self.get(prefix, key).await
    }

    /// Reads a JSON-encoded value.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        prefix: &KeyPrefix,
        key: &str,
    ) -> KestrelResult<Option<T>> {
        Ok(self.get::<Json<T>>(prefix, key).await?.map(Json::into_inner))
    }

    /// Encodes and writes `value` at `prefix + key`.
    ///
    /// Returns `Ok(false)` without touching the store when the value encodes
    /// to nothing or to an empty string. Otherwise writes with `SETEX` if the
    /// namespace expires and plain `SET` if it does not, resetting any
    /// previous TTL either way.
    pub async fn set<V>(&self, prefix: &KeyPrefix, key: &str, value: &V) -> KestrelResult<bool>
    where
        V: CacheEncode + ?Sized,
    {
        let encoded = match value.encode()? {
            Some(encoded) if !encoded.is_empty() => encoded,
            _ => {
                debug!(prefix = %prefix, key, "Skipping write of empty value");
                return Ok(false);
            }
        };

        let real_key = prefix.real_key(key);
        let mut conn = self.scope("set").await?;
        match prefix.ttl_seconds() {
            Some(seconds) => {
                conn.set_ex(&real_key, &encoded, seconds).await?;
                debug!(key = %real_key, ttl_secs = seconds, "Cached value");
            }
            None => {
                conn.set(&real_key, &encoded).await?;
                debug!(key = %real_key, "Cached value without expiry");
            }
        }
        Ok(true)
    }

    /// Deletes `prefix + key`. Returns whether a key was actually removed.
    pub async fn delete(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<bool> {
        let real_key = prefix.real_key(key);
        let mut conn = self.scope("delete").await?;
        let deleted = conn.del(std::slice::from_ref(&real_key)).await?;

        debug!(key = %real_key, deleted = deleted > 0, "Deleted key");
        Ok(deleted > 0)
    }

    /// Checks whether `prefix + key` exists.
    pub async fn exists(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<bool> {
        let real_key = prefix.real_key(key);
        let mut conn = self.scope("exists").await?;
        conn.exists(&real_key).await
    }

    /// Atomically increments the counter at `prefix + key`.
    ///
    /// A missing key counts from zero. A non-numeric value is rejected by the
    /// store and surfaces as [`Store`](kestrel_core::KestrelError::Store).
    pub async fn incr(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<i64> {
        let real_key = prefix.real_key(key);
        let mut conn = self.scope("incr").await?;
        conn.incr(&real_key).await
    }

    /// Atomically decrements the counter at `prefix + key`.
    pub async fn decr(&self, prefix: &KeyPrefix, key: &str) -> KestrelResult<i64> {
        let real_key = prefix.real_key(key);
        let mut conn = self.scope("decr").await?;
        conn.decr(&real_key).await
    }

    /// Lists every store key containing the namespace prefix.
    pub async fn scan_keys(&self, prefix: &KeyPrefix) -> KestrelResult<Vec<String>> {
        let mut conn = self.scope("scan_keys").await?;
        self.scanner.scan(&mut *conn, prefix.prefix()).await
    }

    /// Deletes every key in the namespace.
    ///
    /// Runs a full scan, then one bulk `DEL` of what the scan found, on a
    /// single connection. The two phases are not atomic: a key written after
    /// the scan passes it survives. Returns `true` when the namespace was
    /// already empty or the delete went through, and `false` if any store
    /// error occurred, in which case some keys may already be gone.
    pub async fn delete_by_prefix(&self, prefix: &KeyPrefix) -> bool {
        match self.try_delete_by_prefix(prefix).await {
            Ok(deleted) => {
                debug!(prefix = %prefix, deleted, "Deleted namespace");
                true
            }
            Err(e) => {
                warn!(prefix = %prefix, error = %e, "Bulk delete failed; namespace may be partially deleted");
                false
            }
        }
    }

    async fn try_delete_by_prefix(&self, prefix: &KeyPrefix) -> KestrelResult<u64> {
        let mut conn = self.scope("delete_by_prefix").await?;
        let keys = self.scanner.scan(&mut *conn, prefix.prefix()).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        conn.del(&keys).await
    }
}
