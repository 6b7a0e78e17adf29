//! Store client seams.
//!
//! The facade talks to the store only through these two traits, so the Redis
//! pool and the in-process [`MemoryStore`] are interchangeable.

mod memory;
mod redis_store;

pub use self::memory::{MemoryConnection, MemoryStore};
pub use self::redis_store::{RedisConnection, RedisPool};

use async_trait::async_trait;
use kestrel_core::KestrelResult;

/// One checked-out store connection.
///
/// Dropping the connection hands it back to wherever it came from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreConnection: Send {
    /// `GET key`
    async fn get(&mut self, key: &str) -> KestrelResult<Option<String>>;

    /// `SET key value`, clearing any previous TTL.
    async fn set(&mut self, key: &str, value: &str) -> KestrelResult<()>;

    /// `SETEX key seconds value`
    async fn set_ex(&mut self, key: &str, value: &str, seconds: u64) -> KestrelResult<()>;

    /// `DEL key [key ...]`, returning how many keys were removed.
    async fn del(&mut self, keys: &[String]) -> KestrelResult<u64>;

    /// `EXISTS key`
    async fn exists(&mut self, key: &str) -> KestrelResult<bool>;

    /// `INCR key`
    async fn incr(&mut self, key: &str) -> KestrelResult<i64>;

    /// `DECR key`
    async fn decr(&mut self, key: &str) -> KestrelResult<i64>;

    /// `SCAN cursor MATCH pattern COUNT count`, returning the next cursor and
    /// the keys found in this round.
    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> KestrelResult<(u64, Vec<String>)>;
}

/// A pool of store connections.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    type Connection: StoreConnection + 'static;

    /// Checks out a connection, waiting if none is free.
    async fn acquire(&self) -> KestrelResult<Self::Connection>;
}
