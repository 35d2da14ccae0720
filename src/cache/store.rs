//! Cache store: the fail-soft adapter in front of the active backend.
//!
//! The store picks its backend once, lazily: Redis when a connector is
//! configured and the connection succeeds, the in-process LRU otherwise. Every
//! backend failure after that point is absorbed here and reported as a miss or
//! a logged no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use metrics::counter;
use tokio::sync::{Notify, OnceCell};
use tracing::{debug, info, warn};

use super::backend::{CacheBackend, DistributedConnector};
use super::config::CacheConfig;
use super::error::CacheError;
use super::memory::MemoryBackend;
use super::redis::RedisConnector;

const METRIC_CACHE_BACKEND_ERROR_TOTAL: &str = "critica_cache_backend_error_total";
const METRIC_CACHE_STORE_TOTAL: &str = "critica_cache_store_total";

/// Outcome of a cache read.
#[derive(Debug)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    /// The backend failed; callers treat this exactly like [`CacheLookup::Miss`].
    BackendError(CacheError),
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

pub struct CacheStore {
    connector: Option<Arc<dyn DistributedConnector>>,
    distributed: OnceCell<Option<Arc<dyn CacheBackend>>>,
    fallback: Arc<MemoryBackend>,
    outage_reported: AtomicBool,
    pending_writes: AtomicUsize,
    idle: Notify,
}

impl CacheStore {
    /// Create a store that connects to Redis when `config.redis_url` is set.
    pub fn new(config: &CacheConfig) -> Self {
        let connector = RedisConnector::from_config(config)
            .map(|connector| Arc::new(connector) as Arc<dyn DistributedConnector>);
        Self::build(config, connector)
    }

    /// Create a store with an explicit distributed connector.
    pub fn with_connector(config: &CacheConfig, connector: Arc<dyn DistributedConnector>) -> Self {
        Self::build(config, Some(connector))
    }

    fn build(config: &CacheConfig, connector: Option<Arc<dyn DistributedConnector>>) -> Self {
        Self {
            connector,
            distributed: OnceCell::new(),
            fallback: Arc::new(MemoryBackend::new(config)),
            outage_reported: AtomicBool::new(false),
            pending_writes: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    /// The backend serving requests, connecting on first use.
    ///
    /// Concurrent first callers share one connection attempt; its outcome is
    /// final for the life of the store.
    async fn backend(&self) -> Arc<dyn CacheBackend> {
        let distributed = self
            .distributed
            .get_or_init(|| async {
                let connector = match &self.connector {
                    Some(connector) => connector,
                    None => {
                        info!(backend = "memory", "No distributed cache configured");
                        return None;
                    }
                };

                match connector.connect().await {
                    Ok(backend) => {
                        info!(backend = backend.name(), "Distributed cache connected");
                        Some(backend)
                    }
                    Err(error) => {
                        warn!(
                            error = %error,
                            fallback = "memory",
                            "Distributed cache unavailable, using in-process LRU"
                        );
                        None
                    }
                }
            })
            .await;

        match distributed {
            Some(backend) => Arc::clone(backend),
            None => self.fallback.clone() as Arc<dyn CacheBackend>,
        }
    }

    /// Name of the active backend.
    pub async fn backend_name(&self) -> &'static str {
        self.backend().await.name()
    }

    pub async fn get(&self, key: &str) -> CacheLookup {
        let backend = self.backend().await;
        match backend.get(key).await {
            Ok(Some(value)) => {
                self.note_success();
                CacheLookup::Hit(value)
            }
            Ok(None) => {
                self.note_success();
                CacheLookup::Miss
            }
            Err(error) => {
                self.note_failure(backend.name(), "get", &error);
                CacheLookup::BackendError(error)
            }
        }
    }

    /// Best-effort write; failures are logged and dropped.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let backend = self.backend().await;
        match backend.set(key, value, ttl).await {
            Ok(()) => {
                self.note_success();
                counter!(METRIC_CACHE_STORE_TOTAL, "backend" => backend.name()).increment(1);
            }
            Err(error) => self.note_failure(backend.name(), "set", &error),
        }
    }

    /// Write in a background task without holding up the caller.
    ///
    /// [`CacheStore::wait_idle`] resolves once every spawned write finished.
    pub fn spawn_set(self: &Arc<Self>, key: String, value: String, ttl: Duration) {
        self.pending_writes.fetch_add(1, Ordering::AcqRel);
        let store = Arc::clone(self);
        tokio::spawn(async move {
            store.set(&key, &value, ttl).await;
            if store.pending_writes.fetch_sub(1, Ordering::AcqRel) == 1 {
                store.idle.notify_waiters();
            }
        });
    }

    /// Wait until no background write is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending_writes.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    pub async fn delete(&self, key: &str) -> Result<u64, CacheError> {
        let backend = self.backend().await;
        let result = backend.delete(key).await;
        self.observe(backend.name(), "delete", &result);
        result
    }

    /// Delete every entry whose key starts with the literal `prefix`.
    pub async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let backend = self.backend().await;
        let result = backend.delete_by_prefix(prefix).await;
        self.observe(backend.name(), "delete_by_prefix", &result);
        result
    }

    fn observe<T>(&self, backend: &'static str, op: &'static str, result: &Result<T, CacheError>) {
        match result {
            Ok(_) => self.note_success(),
            Err(error) => self.note_failure(backend, op, error),
        }
    }

    fn note_success(&self) {
        if self.outage_reported.swap(false, Ordering::AcqRel) {
            info!("Cache backend recovered");
        }
    }

    /// Log the first failure of an outage loudly and the rest quietly.
    fn note_failure(&self, backend: &'static str, op: &'static str, error: &CacheError) {
        counter!(METRIC_CACHE_BACKEND_ERROR_TOTAL, "backend" => backend, "op" => op).increment(1);
        if self.outage_reported.swap(true, Ordering::AcqRel) {
            debug!(backend, op, error = %error, "Cache backend operation failed");
        } else {
            warn!(
                backend,
                op,
                error = %error,
                "Cache backend operation failed, serving uncached"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::unavailable("connection reset"))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection reset"))
        }

        async fn delete(&self, _key: &str) -> Result<u64, CacheError> {
            Err(CacheError::unavailable("connection reset"))
        }

        async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(CacheError::unavailable("connection reset"))
        }
    }

    struct CountingConnector {
        attempts: AtomicUsize,
        succeed: bool,
    }

    #[async_trait]
    impl DistributedConnector for CountingConnector {
        async fn connect(&self) -> Result<Arc<dyn CacheBackend>, CacheError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.succeed {
                Ok(Arc::new(BrokenBackend))
            } else {
                Err(CacheError::unavailable("refused"))
            }
        }
    }

    #[tokio::test]
    async fn unconfigured_store_uses_memory() {
        let store = CacheStore::new(&CacheConfig::default());
        assert_eq!(store.backend_name().await, "memory");

        store.set("k", "v", Duration::from_secs(60)).await;
        assert!(matches!(store.get("k").await, CacheLookup::Hit(v) if v == "v"));
        assert!(matches!(store.get("other").await, CacheLookup::Miss));
    }

    #[tokio::test]
    async fn failed_connection_falls_back_and_is_not_retried() {
        let connector = Arc::new(CountingConnector {
            attempts: AtomicUsize::new(0),
            succeed: false,
        });
        let store = Arc::new(CacheStore::with_connector(
            &CacheConfig::default(),
            connector.clone(),
        ));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.set(&format!("k{i}"), "v", Duration::from_secs(60)).await;
            }));
        }
        for handle in handles {
            handle.await.expect("task completes");
        }
        store.get("k0").await;

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(store.backend_name().await, "memory");
        assert!(store.get("k3").await.is_hit());
    }

    #[tokio::test]
    async fn backend_errors_surface_as_lookup_variant() {
        let connector = Arc::new(CountingConnector {
            attempts: AtomicUsize::new(0),
            succeed: true,
        });
        let store = CacheStore::with_connector(&CacheConfig::default(), connector);

        assert_eq!(store.backend_name().await, "broken");
        assert!(matches!(
            store.get("k").await,
            CacheLookup::BackendError(CacheError::Unavailable(_))
        ));

        // Writes swallow the error; deletes report it for the caller to log.
        store.set("k", "v", Duration::from_secs(60)).await;
        assert!(store.delete("k").await.is_err());
        assert!(store.delete_by_prefix("critica:").await.is_err());
    }

    #[tokio::test]
    async fn spawned_writes_are_visible_after_wait_idle() {
        let store = Arc::new(CacheStore::new(&CacheConfig::default()));

        store.spawn_set("a".to_string(), "1".to_string(), Duration::from_secs(60));
        store.spawn_set("b".to_string(), "2".to_string(), Duration::from_secs(60));
        store.wait_idle().await;

        assert!(store.get("a").await.is_hit());
        assert!(store.get("b").await.is_hit());
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_without_writes() {
        let store = CacheStore::new(&CacheConfig::default());
        store.wait_idle().await;
    }
}
