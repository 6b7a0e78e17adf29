//! Per-operation connection scope.

use crate::store::{ConnectionSource, StoreConnection};
use kestrel_core::KestrelResult;
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tracing::{trace, warn};

/// A pooled connection held for exactly one facade operation.
///
/// The connection is owned by the scope and released when the scope is
/// dropped, whichever way the operation exits: normal return, early return,
/// `?` propagation, or unwinding. Ownership makes a second release
/// unrepresentable.
pub struct ConnectionScope<C: StoreConnection> {
    conn: C,
    operation: &'static str,
    acquired_at: Instant,
}

impl<C: StoreConnection> ConnectionScope<C> {
    /// Acquires a connection from `source` for `operation`.
    pub async fn open<S>(source: &S, operation: &'static str) -> KestrelResult<Self>
    where
        S: ConnectionSource<Connection = C> + ?Sized,
    {
        let conn = source.acquire().await.inspect_err(|e| {
            warn!(operation, error = %e, "Failed to acquire store connection");
        })?;
        trace!(operation, "Store connection acquired");

        Ok(Self {
            conn,
            operation,
            acquired_at: Instant::now(),
        })
    }

    /// Releases the connection before the end of the enclosing block.
    pub fn release(self) {}

    /// Microseconds since the connection was acquired, saturating at `u64::MAX`.
    #[must_use]
    pub fn held_micros(&self) -> u64 {
        u64::try_from(self.acquired_at.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

impl<C: StoreConnection> Deref for ConnectionScope<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.conn
    }
}

impl<C: StoreConnection> DerefMut for ConnectionScope<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.conn
    }
}

impl<C: StoreConnection> Drop for ConnectionScope<C> {
    fn drop(&mut self) {
        trace!(
            operation = self.operation,
            held_us = self.held_micros(),
            "Store connection released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use kestrel_core::KestrelError;

    async fn failing_operation(store: &MemoryStore) -> KestrelResult<()> {
        let mut scope = ConnectionScope::open(store, "test").await?;
        scope.incr("not-a-number").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_scope_releases_on_drop() {
        let store = MemoryStore::new();
        {
            let mut scope = ConnectionScope::open(&store, "test").await.unwrap();
            scope.set("k", "v").await.unwrap();
            assert_eq!(store.checked_out(), 1);
        }
        assert_eq!(store.checked_out(), 0);
    }

    #[tokio::test]
    async fn test_scope_releases_on_error_path() {
        let store = MemoryStore::new();
        store.seed("not-a-number", "abc");

        let err = failing_operation(&store).await.unwrap_err();
        assert!(matches!(err, KestrelError::Store(_)));
        assert_eq!(store.checked_out(), 0);
        assert_eq!(store.total_acquired(), 1);
    }

    #[tokio::test]
    async fn test_explicit_release() {
        let store = MemoryStore::with_max_connections(1);
        let scope = ConnectionScope::open(&store, "first").await.unwrap();
        scope.release();
        assert!(ConnectionScope::open(&store, "second").await.is_ok());
    }

    #[tokio::test]
    async fn test_held_time_is_measured_from_acquire() {
        let store = MemoryStore::new();
        let scope = ConnectionScope::open(&store, "test").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        assert!(scope.held_micros() >= 2_000);
    }

    #[tokio::test]
    async fn test_open_propagates_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let result = ConnectionScope::open(&store, "test").await;
        assert!(matches!(result, Err(KestrelError::StoreUnavailable(_))));
        assert_eq!(store.total_acquired(), 0);
    }
}
