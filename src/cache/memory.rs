//! In-process LRU backend.
//!
//! Used when no distributed cache is configured or reachable. Entries are
//! private to this process.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use super::backend::CacheBackend;
use super::config::CacheConfig;
use super::error::CacheError;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::memory";
const METRIC_CACHE_LRU_EVICT_TOTAL: &str = "critica_cache_lru_evict_total";

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Bounded LRU with per-entry expiry.
pub struct MemoryBackend {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryBackend {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.lru_max_items_non_zero())),
        }
    }

    pub fn get_entry(&self, key: &str) -> Option<String> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn set_entry(&self, key: &str, value: &str, ttl: Duration) {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        let evicted = mutex_lock(&self.entries, SOURCE, "set").push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!(METRIC_CACHE_LRU_EVICT_TOTAL).increment(1);
        }
    }

    pub fn delete_entry(&self, key: &str) -> u64 {
        u64::from(mutex_lock(&self.entries, SOURCE, "delete").pop(key).is_some())
    }

    pub fn delete_prefixed(&self, prefix: &str) -> u64 {
        let mut entries = mutex_lock(&self.entries, SOURCE, "delete_by_prefix");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len() as u64
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.get_entry(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.set_entry(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64, CacheError> {
        Ok(self.delete_entry(key))
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        Ok(self.delete_prefixed(prefix))
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn backend_with_capacity(lru_max_items: usize) -> MemoryBackend {
        MemoryBackend::new(&CacheConfig {
            lru_max_items,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn set_then_get_returns_payload_unchanged() {
        let backend = backend_with_capacity(10);
        let payload = r#"{"items":[{"slug":"a"}],"total":1}"#;

        backend
            .set("critica:reviews:list:/reviews", payload, Duration::from_secs(60))
            .await
            .expect("memory set never fails");

        let value = backend
            .get("critica:reviews:list:/reviews")
            .await
            .expect("memory get never fails");
        assert_eq!(value.as_deref(), Some(payload));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_read_as_missing() {
        let backend = backend_with_capacity(10);
        backend.set_entry("k", "v", Duration::from_secs(5));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(backend.get_entry("k").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(backend.get_entry("k").is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let backend = backend_with_capacity(2);
        let ttl = Duration::from_secs(60);

        backend.set_entry("a", "1", ttl);
        backend.set_entry("b", "2", ttl);
        assert!(backend.get_entry("a").is_some());

        backend.set_entry("c", "3", ttl);

        assert!(backend.get_entry("a").is_some());
        assert!(backend.get_entry("b").is_none());
        assert!(backend.get_entry("c").is_some());
    }

    #[test]
    fn delete_prefixed_only_touches_matching_keys() {
        let backend = backend_with_capacity(10);
        let ttl = Duration::from_secs(60);

        backend.set_entry("critica:reviews:latest:/reviews/latest", "1", ttl);
        backend.set_entry("critica:reviews:latest:/reviews/latest?limit=5", "2", ttl);
        backend.set_entry("critica:reviews:list:/reviews", "3", ttl);

        assert_eq!(backend.delete_prefixed("critica:reviews:latest:"), 2);
        assert_eq!(backend.len(), 1);
        assert!(backend.get_entry("critica:reviews:list:/reviews").is_some());
    }

    #[test]
    fn delete_reports_whether_an_entry_was_removed() {
        let backend = backend_with_capacity(10);
        backend.set_entry("k", "v", Duration::from_secs(60));

        assert_eq!(backend.delete_entry("k"), 1);
        assert_eq!(backend.delete_entry("k"), 0);
    }

    #[test]
    fn memory_backend_recovers_from_poisoned_lock() {
        let backend = backend_with_capacity(10);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = backend
                .entries
                .lock()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        backend.set_entry("k", "v", Duration::from_secs(60));
        assert_eq!(backend.get_entry("k").as_deref(), Some("v"));
    }
}
