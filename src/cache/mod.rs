//! Cache gateway: a uniform get/set/delete/delete-by-pattern capability over a
//! key-value store.
//!
//! The store behind the trait is a derived, disposable view of the database.
//! Flushing it wholesale is always safe; every entry carries a TTL as the
//! safety net against missed invalidations. All helpers here are non-fatal:
//! a cache error degrades reads to a recompute and never aborts a write.

pub mod invalidation;
pub mod keys;
mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    /// Scan-and-delete over all keys matching a glob. Not atomic against
    /// concurrent writers; returns the number of keys removed.
    async fn delete_by_pattern(&self, pattern: &str) -> anyhow::Result<u64>;
}

/// Cache-aside read. Returns None on miss, on a corrupt entry, or when the
/// cache backend is unavailable.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "cache entry failed to deserialize, dropping");
                let _ = cache.delete(key).await;
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "cache get failed, falling back to store");
            None
        }
    }
}

/// Cache-miss repopulation. Serialization or backend failures are logged and
/// swallowed; the caller already holds the computed value.
pub async fn put_json<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T, ttl: Duration) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "cache value failed to serialize");
            return;
        }
    };
    if let Err(e) = cache.set(key, &raw, ttl).await {
        warn!(key, error = %e, "cache set failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        total_calories: f64,
        meal_count: i64,
    }

    #[tokio::test]
    async fn hit_returns_exactly_what_was_stored() {
        let cache = MemoryCache::new();
        let value = Payload {
            total_calories: 160.5,
            meal_count: 1,
        };
        put_json(&cache, "nutrition:daily:u:2024-01-10", &value, Duration::from_secs(60)).await;

        let hit: Option<Payload> = get_json(&cache, "nutrition:daily:u:2024-01-10").await;
        assert_eq!(hit, Some(value));
    }

    #[tokio::test]
    async fn corrupt_entries_read_as_misses_and_are_dropped() {
        let cache = MemoryCache::new();
        cache
            .set("bad", "not json {", Duration::from_secs(60))
            .await
            .unwrap();

        let miss: Option<Payload> = get_json(&cache, "bad").await;
        assert!(miss.is_none());
        assert_eq!(cache.get("bad").await.unwrap(), None);
    }
}
