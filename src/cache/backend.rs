//! Backend seams for the cache store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Raw key/value operations against one storage backend.
///
/// Implementations report failures; deciding that a failure is harmless is the
/// job of [`super::CacheStore`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs, metrics and the health endpoint.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Returns the number of entries removed.
    async fn delete(&self, key: &str) -> Result<u64, CacheError>;

    /// Remove every entry whose key starts with `prefix` (a literal, not a
    /// pattern). Returns the number of entries removed.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

/// Establishes a connection to the distributed backend.
///
/// Called at most once per [`super::CacheStore`]; its outcome is kept for the
/// life of the store.
#[async_trait]
pub trait DistributedConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn CacheBackend>, CacheError>;
}
