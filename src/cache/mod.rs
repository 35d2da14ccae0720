//! Critica cache layer.
//!
//! Read-through caching of public GET views with prefix-based invalidation:
//!
//! - **Store**: Redis when configured and reachable, otherwise an in-process
//!   LRU. Backend failures degrade to cache misses.
//! - **Middleware**: per-route read-through wrapper keyed by path and
//!   canonical query.
//! - **Trigger**: runs the invalidation table after every committed write.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via the `[cache]` table of `critica.toml`:
//!
//! ```toml
//! [cache]
//! redis_url = "redis://127.0.0.1:6379"
//! lru_max_items = 1000
//!
//! [cache.ttl]
//! search = 30
//! # ... see config.rs for all options
//! ```

mod backend;
mod config;
mod error;
mod invalidation;
mod keys;
mod lock;
mod memory;
mod middleware;
mod prefix;
mod redis;
mod state;
mod store;
mod trigger;

pub use backend::{CacheBackend, DistributedConnector};
pub use config::{CacheConfig, TtlTable};
pub use error::CacheError;
pub use invalidation::{InvalidationPlan, Mutation, MutationKind, ViewKey, review_detail_path};
pub use keys::{QueryParams, QueryValue, build_key, prefix_scope};
pub use memory::MemoryBackend;
pub use middleware::{CACHE_STATUS_HEADER, RouteCache, cached, cached_with_ttl, response_cache_layer};
pub use prefix::CachePrefix;
pub use redis::{RedisBackend, RedisConnector};
pub use state::CacheState;
pub use store::{CacheLookup, CacheStore};
pub use trigger::{CacheTrigger, InvalidationReport};
