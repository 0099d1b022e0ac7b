//! TTL cache store backing every enrichment resolver
//!
//! Cache-aside semantics: resolvers check the cache before calling an
//! external provider and write the result back afterwards; the cache never
//! fetches missing data itself.
//!
//! The cache is a performance optimization, never a correctness dependency:
//! a storage error on read degrades to a cache miss and a failed write is
//! logged and swallowed, so the caller's resolution always proceeds.

use crate::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, warn};

/// Keyed store mapping a string key to a JSON value with an expiry timestamp.
///
/// An entry whose `expires_at` has passed is logically absent even while
/// physically present: reads evict it lazily, and the periodic sweep
/// ([`CacheStore::purge_expired`]) removes whatever reads have not touched.
#[derive(Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Look up a cached value. Returns `None` when the key is missing,
    /// expired (the row is deleted as a side effect), or the read fails.
    pub async fn get(&self, key: &str) -> Option<Value> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, "Cache get error, treating as miss: {}", e);
                None
            }
        }
    }

    async fn try_get(&self, key: &str) -> Result<Option<Value>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT value, expires_at FROM cache WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((raw_value, expires_at)) = row else {
            return Ok(None);
        };

        if is_expired(&expires_at) {
            // Lazy eviction: the entry is logically absent already
            debug!(key = %key, "Evicting expired cache entry");
            self.delete(key).await;
            return Ok(None);
        }

        match serde_json::from_str(&raw_value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Unreadable payload is as good as absent; drop it
                warn!(key = %key, "Discarding undecodable cache entry: {}", e);
                self.delete(key).await;
                Ok(None)
            }
        }
    }

    /// Insert or fully replace the entry for `key` with `expires_at = now + ttl`.
    ///
    /// Write failures are logged and swallowed: a failed cache write must not
    /// fail the resolution that produced the value.
    pub async fn set(&self, key: &str, value: &Value, ttl: Duration) {
        let expires_at = format_timestamp(
            Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()),
        );
        let raw_value = value.to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO cache (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(&raw_value)
        .bind(&expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => debug!(key = %key, expires_at = %expires_at, "Cache set"),
            Err(e) => warn!(key = %key, "Cache set error (ignored): {}", e),
        }
    }

    /// Unconditional removal; not an error if the key is absent.
    pub async fn delete(&self, key: &str) {
        if let Err(e) = sqlx::query("DELETE FROM cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
        {
            warn!(key = %key, "Cache delete error (ignored): {}", e);
        }
    }

    /// Delete every entry whose expiry is strictly before now.
    ///
    /// Idempotent and safe to run concurrently with get/set traffic; it only
    /// removes entries that are already logically absent. Returns the number
    /// of rows deleted. A failed sweep is non-fatal to callers: more lazy
    /// evictions happen on the read path until the next successful sweep.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = format_timestamp(Utc::now());
        let result = sqlx::query("DELETE FROM cache WHERE expires_at < ?")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Deterministic fingerprint for cache keys derived from free text
/// (location descriptions, image URLs, analysis inputs).
///
/// SHA-256 truncated to 32 hex characters: stable across processes and
/// collision-resistant for distinct semantic inputs, unlike the raw text
/// which may be arbitrarily long or contain key-hostile characters.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..32].to_string()
}

/// Timestamps are stored as fixed-width RFC 3339 UTC so that string
/// comparison in SQL matches chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_expired(expires_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(ts) => ts.with_timezone(&Utc) <= Utc::now(),
        // An unparseable expiry is treated as expired rather than immortal
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint("Lower East Side"), fingerprint("Lower East Side"));
        assert_ne!(fingerprint("Lower East Side"), fingerprint("Upper West Side"));
        assert_eq!(fingerprint("anything").len(), 32);
    }

    #[test]
    fn timestamps_order_lexicographically() {
        let earlier = format_timestamp(Utc::now());
        let later = format_timestamp(Utc::now() + chrono::Duration::hours(1));
        assert!(earlier < later);
    }

    #[test]
    fn unparseable_expiry_counts_as_expired() {
        assert!(is_expired("not-a-timestamp"));
        assert!(is_expired(&format_timestamp(
            Utc::now() - chrono::Duration::seconds(1)
        )));
        assert!(!is_expired(&format_timestamp(
            Utc::now() + chrono::Duration::hours(1)
        )));
    }
}
