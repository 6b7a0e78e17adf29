//! # Kestrel Cache
//!
//! A typed caching facade over a pooled key-value store.
//!
//! Keys live in namespaces ([`KeyPrefix`]) that carry their own expiry
//! policy. Values are converted by the [`codec`]: integers as exact decimal
//! text, strings as-is, anything else as JSON via [`Json`]. Each operation
//! checks out one pooled connection through a [`ConnectionScope`] and gives
//! it back on every exit path.
//!
//! ```no_run
//! use kestrel_cache::{CacheService, KeyPrefix, MemoryStore};
//!
//! # async fn demo() -> kestrel_core::KestrelResult<()> {
//! let cache = CacheService::new(MemoryStore::new());
//! let stock = KeyPrefix::namespaced("GoodsKey", "stock", 0);
//!
//! cache.set(&stock, "1001", &10i64).await?;
//! let remaining = cache.decr(&stock, "1001").await?;
//! assert_eq!(remaining, 9);
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod prefix;
mod scanner;
mod scope;
mod service;
pub mod store;

pub use codec::{CacheDecode, CacheEncode, Json};
pub use prefix::{ensure_disjoint, KeyPrefix};
pub use scanner::{PatternScanner, DEFAULT_SCAN_BATCH, SCAN_SENTINEL};
pub use scope::ConnectionScope;
pub use service::CacheService;
pub use store::{ConnectionSource, MemoryStore, RedisPool, StoreConnection};
