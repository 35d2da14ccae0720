//! Cache configuration.
//!
//! Built from the `[cache]` table of `critica.toml` after validation in
//! [`crate::config`].

use std::num::NonZeroUsize;
use std::time::Duration;

use super::prefix::CachePrefix;

pub(crate) const DEFAULT_NAMESPACE: &str = "critica";
pub(crate) const DEFAULT_LRU_MAX_ITEMS: usize = 1000;
pub(crate) const DEFAULT_SCAN_BATCH_SIZE: usize = 200;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
pub(crate) const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 500;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Time-to-live per prefix, in seconds.
///
/// Category lists barely change; search results churn constantly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlTable {
    pub categories: u64,
    pub reviews_latest: u64,
    pub reviews_popular: u64,
    pub reviews_list: u64,
    pub reviews_slug: u64,
    pub users_profile: u64,
    pub users_reviews: u64,
    pub search: u64,
    pub sitemap_reviews: u64,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            categories: 3600,
            reviews_latest: 60,
            reviews_popular: 300,
            reviews_list: 120,
            reviews_slug: 300,
            users_profile: 300,
            users_reviews: 120,
            search: 30,
            sitemap_reviews: 3600,
        }
    }
}

impl TtlTable {
    pub fn seconds(&self, prefix: CachePrefix) -> u64 {
        match prefix {
            CachePrefix::Categories => self.categories,
            CachePrefix::ReviewsLatest => self.reviews_latest,
            CachePrefix::ReviewsPopular => self.reviews_popular,
            CachePrefix::ReviewsList => self.reviews_list,
            CachePrefix::ReviewsSlug => self.reviews_slug,
            CachePrefix::UsersProfile => self.users_profile,
            CachePrefix::UsersReviews => self.users_reviews,
            CachePrefix::Search => self.search,
            CachePrefix::SitemapReviews => self.sitemap_reviews,
        }
    }

    pub fn for_prefix(&self, prefix: CachePrefix) -> Duration {
        Duration::from_secs(self.seconds(prefix))
    }
}

/// Runtime cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Master switch; when off, routes are served uncached and writes skip invalidation.
    pub enabled: bool,
    /// Redis connection string. `None` selects the in-process LRU.
    pub redis_url: Option<String>,
    /// First key segment, shared by every entry this process writes.
    pub namespace: String,
    /// Capacity of the in-process LRU fallback.
    pub lru_max_items: usize,
    /// Keys requested per `SCAN` round-trip during bulk invalidation.
    pub scan_batch_size: usize,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    /// Response bodies above this size are served but not cached.
    pub max_body_bytes: usize,
    pub ttl: TtlTable,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            lru_max_items: DEFAULT_LRU_MAX_ITEMS,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            ttl: TtlTable::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            redis_url: settings.redis_url.clone(),
            namespace: settings.namespace.clone(),
            lru_max_items: settings.lru_max_items.get(),
            scan_batch_size: settings.scan_batch_size.get(),
            connect_timeout: settings.connect_timeout,
            operation_timeout: settings.operation_timeout,
            max_body_bytes: settings.max_body_bytes.get(),
            ttl: settings.ttl.clone(),
        }
    }
}

impl CacheConfig {
    /// LRU capacity, clamped to 1 if zero.
    pub fn lru_max_items_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.lru_max_items).unwrap_or(NonZeroUsize::MIN)
    }

    /// SCAN batch size, clamped to 1 if zero.
    pub fn scan_batch_size_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.scan_batch_size).unwrap_or(NonZeroUsize::MIN)
    }
}
