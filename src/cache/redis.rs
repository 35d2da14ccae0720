//! Redis backend.
//!
//! Every command is bounded by the configured operation timeout. Bulk
//! invalidation walks the keyspace with `SCAN` in fixed-size pages and deletes
//! each page as it goes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::time::timeout;
use tracing::debug;

use super::backend::{CacheBackend, DistributedConnector};
use super::config::CacheConfig;
use super::error::CacheError;

/// Connects to Redis and verifies the connection with `PING`.
#[derive(Debug, Clone)]
pub struct RedisConnector {
    url: String,
    connect_timeout: Duration,
    operation_timeout: Duration,
    scan_batch_size: usize,
}

impl RedisConnector {
    /// Returns `None` when no Redis URL is configured.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        let url = config.redis_url.as_ref()?;
        Some(Self {
            url: url.clone(),
            connect_timeout: config.connect_timeout,
            operation_timeout: config.operation_timeout,
            scan_batch_size: config.scan_batch_size_non_zero().get(),
        })
    }
}

#[async_trait]
impl DistributedConnector for RedisConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheBackend>, CacheError> {
        let client = Client::open(self.url.as_str())?;

        let mut conn = timeout(
            self.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::timeout("connect", self.connect_timeout))??;

        let pong: String = timeout(
            self.connect_timeout,
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| CacheError::timeout("ping", self.connect_timeout))??;
        debug!(reply = %pong, "redis connection verified");

        Ok(Arc::new(RedisBackend {
            conn,
            operation_timeout: self.operation_timeout,
            scan_batch_size: self.scan_batch_size,
        }))
    }
}

/// Cache backend over a multiplexed Redis connection.
pub struct RedisBackend {
    conn: MultiplexedConnection,
    operation_timeout: Duration,
    scan_batch_size: usize,
}

impl RedisBackend {
    async fn bounded<T, F>(&self, op: &'static str, command: F) -> Result<T, CacheError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.operation_timeout, command).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::timeout(op, self.operation_timeout)),
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        self.bounded("get", conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        self.bounded("set", conn.set_ex(key, value, seconds)).await
    }

    async fn delete(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        self.bounded("delete", conn.del(key)).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .bounded(
                    "scan",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(self.scan_batch_size)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let removed: u64 = self.bounded("delete", conn.del(&keys)).await?;
                deleted += removed;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(deleted)
    }
}

/// Escape Redis glob metacharacters so `literal` matches only itself.
pub(crate) fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
