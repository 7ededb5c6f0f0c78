//! Process-local cache backend.
//!
//! Used when no `REDIS_URL` is configured and as the substitute in tests.
//! Semantics mirror the Redis backend: TTL expiry and glob pattern deletion.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::CacheStore;

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .remove(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> anyhow::Result<u64> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok((before - entries.len()) as u64)
    }
}

/// Minimal glob matcher supporting `*` (any run of characters), which is the
/// only wildcard the key layout uses.
fn glob_match(pattern: &str, input: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == input,
        Some((prefix, rest)) => {
            if !input.starts_with(prefix) {
                return false;
            }
            let input = &input[prefix.len()..];
            if rest.is_empty() {
                return true;
            }
            input
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(input.len()))
                .any(|i| glob_match(rest, &input[i..]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_prefix_patterns() {
        assert!(glob_match("meals:user:u1:*", "meals:user:u1:all:20:0"));
        assert!(!glob_match("meals:user:u1:*", "meals:user:u2:all:20:0"));
        assert!(glob_match("nutrition:*:u1:*", "nutrition:daily:u1:2024-01-10"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_by_pattern_removes_only_matches() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("meals:user:u1:all:20:0", "a", ttl).await.unwrap();
        cache.set("meals:user:u1:all:20:20", "b", ttl).await.unwrap();
        cache.set("meals:user:u2:all:20:0", "c", ttl).await.unwrap();

        let removed = cache.delete_by_pattern("meals:user:u1:*").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.get("meals:user:u1:all:20:0").await.unwrap(), None);
        assert!(cache.get("meals:user:u2:all:20:0").await.unwrap().is_some());
    }
}
