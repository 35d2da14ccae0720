//! Cache trigger service.
//!
//! Called by application services after a write has committed. Runs the
//! matching [`InvalidationPlan`] against the store before the write's response
//! is produced.

use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, instrument, warn};

use super::invalidation::{InvalidationPlan, Mutation, ViewKey};
use super::prefix::CachePrefix;
use super::state::CacheState;

const METRIC_CACHE_INVALIDATION_TOTAL: &str = "critica_cache_invalidation_total";
const METRIC_CACHE_INVALIDATE_MS: &str = "critica_cache_invalidate_ms";

/// Outcome of running one plan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationReport {
    pub prefixes_cleared: usize,
    pub keys_evicted: usize,
    /// Entries the backend reported as removed.
    pub entries_removed: u64,
    pub failures: usize,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Cache trigger for write paths.
///
/// # Usage
///
/// ```ignore
/// // After the status update committed:
/// cache.trigger().review_status_changed(&review.slug).await;
/// ```
#[derive(Clone)]
pub struct CacheTrigger {
    cache: CacheState,
}

impl CacheTrigger {
    pub fn new(cache: CacheState) -> Self {
        Self { cache }
    }

    /// Invalidate everything `mutation` can stale.
    #[instrument(skip(self), fields(kind = %mutation.kind()))]
    pub async fn trigger(&self, mutation: Mutation) -> InvalidationReport {
        let plan = InvalidationPlan::for_mutation(&mutation);
        self.execute(&plan).await
    }

    /// Invalidate for several writes at once, deduplicating shared work.
    pub async fn trigger_all(&self, mutations: &[Mutation]) -> InvalidationReport {
        let plan = InvalidationPlan::from_mutations(mutations);
        self.execute(&plan).await
    }

    /// Run a plan. Failures are logged and counted, never returned.
    pub async fn execute(&self, plan: &InvalidationPlan) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        if !self.cache.is_enabled() {
            debug!(%plan, "Cache trigger skipped: cache disabled");
            return report;
        }
        if plan.is_empty() {
            return report;
        }

        let started = Instant::now();
        for prefix in &plan.prefixes {
            self.clear_prefix(*prefix, &mut report).await;
        }
        for key in &plan.keys {
            self.evict(key, &mut report).await;
        }
        histogram!(METRIC_CACHE_INVALIDATE_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        debug!(
            %plan,
            prefixes_cleared = report.prefixes_cleared,
            keys_evicted = report.keys_evicted,
            entries_removed = report.entries_removed,
            failures = report.failures,
            "Cache invalidation finished"
        );
        report
    }

    /// Clear every view under each of `prefixes`.
    pub async fn invalidate_prefixes(&self, prefixes: &[CachePrefix]) -> InvalidationReport {
        let plan = InvalidationPlan {
            prefixes: prefixes.iter().copied().collect(),
            ..Default::default()
        };
        self.execute(&plan).await
    }

    /// Evict one view and its query-string variants.
    pub async fn invalidate_key(&self, prefix: CachePrefix, path: &str) -> InvalidationReport {
        let plan = InvalidationPlan {
            keys: [ViewKey {
                prefix,
                path: path.to_string(),
            }]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        self.execute(&plan).await
    }

    pub async fn review_status_changed(&self, slug: &str) -> InvalidationReport {
        self.trigger(Mutation::ReviewStatusChanged {
            slug: slug.to_string(),
        })
        .await
    }

    pub async fn review_created(&self) -> InvalidationReport {
        self.trigger(Mutation::ReviewCreated).await
    }

    pub async fn comment_status_changed(&self, review_slug: &str) -> InvalidationReport {
        self.trigger(Mutation::CommentStatusChanged {
            review_slug: review_slug.to_string(),
        })
        .await
    }

    pub async fn comment_posted(&self, review_slug: &str) -> InvalidationReport {
        self.trigger(Mutation::CommentPosted {
            review_slug: review_slug.to_string(),
        })
        .await
    }

    pub async fn vote_cast(&self, review_slug: &str) -> InvalidationReport {
        self.trigger(Mutation::VoteCast {
            review_slug: review_slug.to_string(),
        })
        .await
    }

    pub async fn user_role_changed(&self) -> InvalidationReport {
        self.trigger(Mutation::UserRoleChanged).await
    }

    pub async fn category_changed(&self) -> InvalidationReport {
        self.trigger(Mutation::CategoryChanged).await
    }

    async fn clear_prefix(&self, prefix: CachePrefix, report: &mut InvalidationReport) {
        let scope = self.cache.scope(prefix);
        match self.cache.store.delete_by_prefix(&scope).await {
            Ok(removed) => {
                report.prefixes_cleared += 1;
                report.entries_removed += removed;
                counter!(METRIC_CACHE_INVALIDATION_TOTAL, "kind" => "prefix", "prefix" => prefix.as_str())
                    .increment(1);
            }
            Err(error) => {
                report.failures += 1;
                warn!(
                    prefix = %prefix,
                    error = %error,
                    "Cache prefix invalidation failed; entries stay until ttl"
                );
            }
        }
    }

    /// Delete the bare key, then any `?query` variants of it.
    async fn evict(&self, key: &ViewKey, report: &mut InvalidationReport) {
        let bare = self.cache.key(key.prefix, &key.path, None);
        let variants = format!("{bare}?");

        let result = match self.cache.store.delete(&bare).await {
            Ok(removed) => self
                .cache
                .store
                .delete_by_prefix(&variants)
                .await
                .map(|variants_removed| removed + variants_removed),
            Err(error) => Err(error),
        };

        match result {
            Ok(removed) => {
                report.keys_evicted += 1;
                report.entries_removed += removed;
                counter!(METRIC_CACHE_INVALIDATION_TOTAL, "kind" => "key", "prefix" => key.prefix.as_str())
                    .increment(1);
            }
            Err(error) => {
                report.failures += 1;
                warn!(
                    key = %bare,
                    error = %error,
                    "Cache key invalidation failed; entry stays until ttl"
                );
            }
        }
    }
}
