//! In-process cache implementation.

use super::service::{CacheResult, LinkCache, RedirectCacheEntry};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A cache living in the server process.
///
/// Used when Redis is not configured and by tests. Entries expire lazily on
/// read. Counters are exact within one process, so generated aliases are unique
/// only as long as a single instance issues them.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (RedirectCacheEntry, Instant)>,
    counters: DashMap<String, u64>,
}

impl MemoryCache {
    pub fn new() -> Self {
        debug!("Using in-process cache");
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().1 > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LinkCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<RedirectCacheEntry>> {
        let now = Instant::now();
        if let Some(found) = self.entries.get(key) {
            let (entry, expires_at) = found.value();
            if *expires_at > now {
                return Ok(Some(entry.clone()));
            }
        }

        self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, entry: &RedirectCacheEntry, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.entries
            .insert(key.to_string(), (entry.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn evict(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn atomic_increment(&self, counter_key: &str) -> CacheResult<u64> {
        let mut value = self.counters.entry(counter_key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn seed_counter(&self, counter_key: &str, floor: u64) -> CacheResult<()> {
        let mut value = self.counters.entry(counter_key.to_string()).or_insert(0);
        *value = (*value).max(floor);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn entry(alias: &str) -> RedirectCacheEntry {
        RedirectCacheEntry {
            row_id: 1,
            alias: alias.to_string(),
            url: "https://example.org".to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_get_evict() {
        let cache = MemoryCache::new();
        cache
            .set("public:a", &entry("a"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("public:a").await.unwrap(), Some(entry("a")));

        cache.evict("public:a").await.unwrap();
        assert_eq!(cache.get("public:a").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("public:a", &entry("a"), Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get("public:a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("public:a").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let cache = MemoryCache::new();
        cache
            .set("public:a", &entry("a"), Duration::ZERO)
            .await
            .unwrap();
        assert!(cache.get("public:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_counter_starts_at_one() {
        let cache = MemoryCache::new();
        assert_eq!(cache.atomic_increment("c").await.unwrap(), 1);
        assert_eq!(cache.atomic_increment("c").await.unwrap(), 2);
        assert_eq!(cache.atomic_increment("other").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_counter_only_raises() {
        let cache = MemoryCache::new();
        cache.seed_counter("c", 41).await.unwrap();
        assert_eq!(cache.atomic_increment("c").await.unwrap(), 42);

        cache.seed_counter("c", 5).await.unwrap();
        assert_eq!(cache.atomic_increment("c").await.unwrap(), 43);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_counter_is_atomic_under_concurrency() {
        let cache = Arc::new(MemoryCache::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..250 {
                    seen.push(cache.atomic_increment("c").await.unwrap());
                }
                seen
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for value in handle.await.unwrap() {
                assert!(all.insert(value), "duplicate counter value {value}");
            }
        }

        assert_eq!(all.len(), 2000);
        assert_eq!(all.iter().max(), Some(&2000));
    }
}
