//! Integration tests for `CacheService` over a real Redis server.
//!
//! These tests run against Redis using testcontainers and require Docker,
//! so they are ignored by default: `cargo test -- --ignored`.

mod common;

use common::TestRedis;
use kestrel_cache::{Json, KeyPrefix};
use kestrel_core::KestrelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct OrderInfo {
    id: i64,
    goods_id: i64,
    status: i32,
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_round_trips_on_redis() {
    let redis = TestRedis::new().await;
    let cache = redis.cache();
    let prefix = KeyPrefix::namespaced("OrderKey", "moug", 0);

    assert!(cache.set(&prefix, "max", &i64::MAX).await.unwrap());
    assert_eq!(cache.get_i64(&prefix, "max").await.unwrap(), Some(i64::MAX));

    let order = OrderInfo {
        id: 7,
        goods_id: 1001,
        status: 0,
    };
    assert!(cache.set(&prefix, "7", &Json(&order)).await.unwrap());
    assert_eq!(cache.get_json::<OrderInfo>(&prefix, "7").await.unwrap(), Some(order));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_counters_and_errors_on_redis() {
    let redis = TestRedis::new().await;
    let cache = redis.cache();
    let prefix = KeyPrefix::new("stock:", 60);

    assert_eq!(cache.incr(&prefix, "1").await.unwrap(), 1);
    assert_eq!(cache.incr(&prefix, "1").await.unwrap(), 2);
    assert_eq!(cache.decr(&prefix, "1").await.unwrap(), 1);

    cache.set(&prefix, "2", "lots").await.unwrap();
    assert!(matches!(cache.incr(&prefix, "2").await, Err(KestrelError::Store(_))));
    assert!(matches!(
        cache.get_i64(&prefix, "2").await,
        Err(KestrelError::Serialization(_))
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_delete_and_bulk_delete_on_redis() {
    let redis = TestRedis::new().await;
    let cache = redis.cache().with_scan_batch_size(5);
    let p = KeyPrefix::new("goods:", 0);
    let q = KeyPrefix::new("order:", 0);

    assert!(!cache.delete(&p, "missing").await.unwrap());

    for i in 0..40 {
        cache.set(&p, &i.to_string(), &i).await.unwrap();
    }
    cache.set(&q, "x", "keep").await.unwrap();

    assert_eq!(cache.scan_keys(&p).await.unwrap().len(), 40);
    assert!(cache.delete_by_prefix(&p).await);
    assert!(cache.scan_keys(&p).await.unwrap().is_empty());
    assert!(cache.exists(&q, "x").await.unwrap());
    assert!(cache.delete_by_prefix(&p).await);
}
