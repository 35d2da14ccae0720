//! Process-scoped cache service handed to the router and application services.

use std::sync::Arc;
use std::time::Duration;

use super::backend::DistributedConnector;
use super::config::CacheConfig;
use super::keys::{QueryParams, build_key, prefix_scope};
use super::prefix::CachePrefix;
use super::store::CacheStore;
use super::trigger::CacheTrigger;

/// Shared cache state.
///
/// Cheap to clone; every clone talks to the same store.
#[derive(Clone)]
pub struct CacheState {
    pub config: Arc<CacheConfig>,
    pub store: Arc<CacheStore>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(CacheStore::new(&config));
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// State whose distributed backend comes from `connector`.
    pub fn with_connector(config: CacheConfig, connector: Arc<dyn DistributedConnector>) -> Self {
        let store = Arc::new(CacheStore::with_connector(&config, connector));
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Full key for a view in this namespace.
    pub fn key(&self, prefix: CachePrefix, path: &str, query: Option<&QueryParams>) -> String {
        build_key(&self.config.namespace, prefix, path, query)
    }

    /// Literal prefix shared by every key under `prefix`.
    pub fn scope(&self, prefix: CachePrefix) -> String {
        prefix_scope(&self.config.namespace, prefix)
    }

    pub fn ttl(&self, prefix: CachePrefix) -> Duration {
        self.config.ttl.for_prefix(prefix)
    }

    pub fn trigger(&self) -> CacheTrigger {
        CacheTrigger::new(self.clone())
    }

    pub async fn backend_name(&self) -> &'static str {
        self.store.backend_name().await
    }

    /// Wait for background cache writes to land.
    pub async fn wait_idle(&self) {
        self.store.wait_idle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_configured_namespace() {
        let state = CacheState::new(CacheConfig {
            namespace: "staging".to_string(),
            ..Default::default()
        });

        assert_eq!(
            state.key(CachePrefix::Categories, "/categories", None),
            "staging:categories:/categories"
        );
        assert_eq!(state.scope(CachePrefix::Search), "staging:search:");
    }

    #[test]
    fn ttl_follows_table() {
        let state = CacheState::new(CacheConfig::default());
        assert_eq!(state.ttl(CachePrefix::Search), Duration::from_secs(30));
    }
}
