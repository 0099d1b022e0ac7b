//! Integration tests for the TTL cache store
//!
//! Covers the cache-aside contract: TTL visibility window, lazy eviction,
//! upsert semantics, sweep idempotence, and degradation on storage errors.

use drp_common::cache::{format_timestamp, CacheStore};
use drp_common::db::init_schema;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;

/// Test helper: in-memory SQLite with the cache schema applied.
///
/// A single connection is required: each `:memory:` connection is its own
/// database, so a larger pool would scatter rows across databases.
async fn setup_cache() -> CacheStore {
    let pool: SqlitePool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");

    init_schema(&pool).await.expect("Should apply cache schema");
    CacheStore::new(pool)
}

/// Test helper: force an entry's expiry into the past without going through
/// `set`, simulating the passage of wall-clock time.
async fn backdate_expiry(cache: &CacheStore, key: &str, hours_ago: i64) {
    let expired = format_timestamp(chrono::Utc::now() - chrono::Duration::hours(hours_ago));
    sqlx::query("UPDATE cache SET expires_at = ? WHERE key = ?")
        .bind(&expired)
        .bind(key)
        .execute(cache.pool())
        .await
        .expect("Should backdate expiry");
}

async fn row_count(cache: &CacheStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM cache")
        .fetch_one(cache.pool())
        .await
        .expect("Should count rows")
}

#[tokio::test]
async fn set_then_get_returns_value_within_ttl() {
    let cache = setup_cache().await;
    let value = json!({"lat": 40.7831, "lng": -73.9712});

    cache.set("geocode_manhattan", &value, Duration::from_secs(3600)).await;

    assert_eq!(cache.get("geocode_manhattan").await, Some(value));
}

#[tokio::test]
async fn get_missing_key_is_absent() {
    let cache = setup_cache().await;
    assert_eq!(cache.get("never_set").await, None);
}

#[tokio::test]
async fn expired_entry_is_absent_and_lazily_evicted() {
    let cache = setup_cache().await;
    cache.set("stale", &json!("old"), Duration::from_secs(3600)).await;
    backdate_expiry(&cache, "stale", 1).await;

    assert_eq!(cache.get("stale").await, None);
    // The read deleted the physically-present row as a side effect
    assert_eq!(row_count(&cache).await, 0);
}

#[tokio::test]
async fn set_upserts_existing_key() {
    let cache = setup_cache().await;
    cache.set("k", &json!({"v": 1}), Duration::from_secs(60)).await;
    cache.set("k", &json!({"v": 2}), Duration::from_secs(60)).await;

    assert_eq!(cache.get("k").await, Some(json!({"v": 2})));
    assert_eq!(row_count(&cache).await, 1);
}

#[tokio::test]
async fn repeated_identical_set_is_idempotent() {
    let cache = setup_cache().await;
    let value = json!({"posts": [], "total": 0});

    cache.set("social", &value, Duration::from_secs(900)).await;
    cache.set("social", &value, Duration::from_secs(900)).await;

    assert_eq!(cache.get("social").await, Some(value));
    assert_eq!(row_count(&cache).await, 1);
}

#[tokio::test]
async fn delete_is_unconditional() {
    let cache = setup_cache().await;
    cache.set("k", &json!(true), Duration::from_secs(60)).await;

    cache.delete("k").await;
    assert_eq!(cache.get("k").await, None);

    // Deleting an absent key is not an error
    cache.delete("k").await;
}

#[tokio::test]
async fn purge_expired_is_idempotent() {
    let cache = setup_cache().await;
    cache.set("expired_a", &json!(1), Duration::from_secs(3600)).await;
    cache.set("expired_b", &json!(2), Duration::from_secs(3600)).await;
    cache.set("live", &json!(3), Duration::from_secs(3600)).await;
    backdate_expiry(&cache, "expired_a", 2).await;
    backdate_expiry(&cache, "expired_b", 2).await;

    let first = cache.purge_expired().await.expect("First sweep should succeed");
    assert_eq!(first, 2);

    // Second consecutive run with no intervening writes deletes nothing
    let second = cache.purge_expired().await.expect("Second sweep should succeed");
    assert_eq!(second, 0);

    assert_eq!(cache.get("live").await, Some(json!(3)));
}

#[tokio::test]
async fn geocode_entry_survives_one_hour_but_not_twenty_five() {
    let cache = setup_cache().await;
    let value = json!({"lat": 48.85, "lng": 2.35});
    cache.set("geocode_paris", &value, Duration::from_secs(24 * 3600)).await;

    // T+1h: still within the 24h window
    backdate_expiry(&cache, "geocode_paris", -23).await;
    assert_eq!(cache.get("geocode_paris").await, Some(value));

    // T+25h: past expiry, logically absent
    backdate_expiry(&cache, "geocode_paris", 1).await;
    assert_eq!(cache.get("geocode_paris").await, None);
}

#[tokio::test]
async fn storage_failure_degrades_to_miss() {
    let cache = setup_cache().await;
    cache.set("k", &json!(1), Duration::from_secs(60)).await;

    // A closed pool makes every operation fail at the storage layer
    cache.pool().close().await;

    // Reads degrade to a miss, writes and deletes are swallowed
    assert_eq!(cache.get("k").await, None);
    cache.set("k2", &json!(2), Duration::from_secs(60)).await;
    cache.delete("k").await;

    // Only the sweep reports its failure
    assert!(cache.purge_expired().await.is_err());
}

#[tokio::test]
async fn undecodable_payload_is_treated_as_absent() {
    let cache = setup_cache().await;
    let future = format_timestamp(chrono::Utc::now() + chrono::Duration::hours(1));
    sqlx::query("INSERT INTO cache (key, value, expires_at) VALUES (?, ?, ?)")
        .bind("corrupt")
        .bind("{not json")
        .bind(&future)
        .execute(cache.pool())
        .await
        .expect("Should insert corrupt row");

    assert_eq!(cache.get("corrupt").await, None);
    assert_eq!(row_count(&cache).await, 0);
}
