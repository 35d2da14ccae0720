//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::TtlTable;

mod cli;

pub use cli::{CacheOverrides, CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "critica";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CACHE_NAMESPACE: &str = "critica";
const DEFAULT_CACHE_LRU_MAX_ITEMS: u64 = 1000;
const DEFAULT_CACHE_SCAN_BATCH_SIZE: u64 = 200;
const DEFAULT_CACHE_CONNECT_TIMEOUT_MS: u64 = 2000;
const DEFAULT_CACHE_OPERATION_TIMEOUT_MS: u64 = 500;
const DEFAULT_CACHE_MAX_BODY_BYTES: u64 = 1024 * 1024;
const REDIS_SCHEMES: &[&str] = &["redis", "rediss", "redis+unix", "unix"];

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub redis_url: Option<String>,
    pub namespace: String,
    pub lru_max_items: NonZeroUsize,
    pub scan_batch_size: NonZeroUsize,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub max_body_bytes: NonZeroUsize,
    pub ttl: TtlTable,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("CRITICA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_cache_overrides(&overrides.cache);
    }

    fn apply_cache_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(namespace) = overrides.namespace.as_ref() {
            self.cache.namespace = Some(namespace.clone());
        }
        if let Some(max) = overrides.lru_max_items {
            self.cache.lru_max_items = Some(max);
        }
        if let Some(enabled) = overrides.enabled {
            self.cache.enabled = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            server,
            logging,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let redis_url = cache
        .redis_url
        .and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .map(validate_redis_url)
        .transpose()?;

    let namespace = cache
        .namespace
        .unwrap_or_else(|| DEFAULT_CACHE_NAMESPACE.to_string());
    if namespace.is_empty()
        || !namespace
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(LoadError::invalid(
            "cache.namespace",
            "must be non-empty and contain only ASCII letters, digits, `-` or `_`",
        ));
    }

    let lru_max_items = non_zero_usize(
        cache.lru_max_items.unwrap_or(DEFAULT_CACHE_LRU_MAX_ITEMS),
        "cache.lru_max_items",
    )?;
    let scan_batch_size = non_zero_usize(
        cache.scan_batch_size.unwrap_or(DEFAULT_CACHE_SCAN_BATCH_SIZE),
        "cache.scan_batch_size",
    )?;
    let max_body_bytes = non_zero_usize(
        cache.max_body_bytes.unwrap_or(DEFAULT_CACHE_MAX_BODY_BYTES),
        "cache.max_body_bytes",
    )?;
    let connect_timeout = millis(
        cache
            .connect_timeout_ms
            .unwrap_or(DEFAULT_CACHE_CONNECT_TIMEOUT_MS),
        "cache.connect_timeout_ms",
    )?;
    let operation_timeout = millis(
        cache
            .operation_timeout_ms
            .unwrap_or(DEFAULT_CACHE_OPERATION_TIMEOUT_MS),
        "cache.operation_timeout_ms",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        redis_url,
        namespace,
        lru_max_items,
        scan_batch_size,
        connect_timeout,
        operation_timeout,
        max_body_bytes,
        ttl: build_ttl_table(cache.ttl)?,
    })
}

fn build_ttl_table(raw: RawTtlSettings) -> Result<TtlTable, LoadError> {
    let defaults = TtlTable::default();
    Ok(TtlTable {
        categories: ttl_seconds(raw.categories, defaults.categories, "cache.ttl.categories")?,
        reviews_latest: ttl_seconds(
            raw.reviews_latest,
            defaults.reviews_latest,
            "cache.ttl.reviews_latest",
        )?,
        reviews_popular: ttl_seconds(
            raw.reviews_popular,
            defaults.reviews_popular,
            "cache.ttl.reviews_popular",
        )?,
        reviews_list: ttl_seconds(
            raw.reviews_list,
            defaults.reviews_list,
            "cache.ttl.reviews_list",
        )?,
        reviews_slug: ttl_seconds(
            raw.reviews_slug,
            defaults.reviews_slug,
            "cache.ttl.reviews_slug",
        )?,
        users_profile: ttl_seconds(
            raw.users_profile,
            defaults.users_profile,
            "cache.ttl.users_profile",
        )?,
        users_reviews: ttl_seconds(
            raw.users_reviews,
            defaults.users_reviews,
            "cache.ttl.users_reviews",
        )?,
        search: ttl_seconds(raw.search, defaults.search, "cache.ttl.search")?,
        sitemap_reviews: ttl_seconds(
            raw.sitemap_reviews,
            defaults.sitemap_reviews,
            "cache.ttl.sitemap_reviews",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    redis_url: Option<String>,
    namespace: Option<String>,
    lru_max_items: Option<u64>,
    scan_batch_size: Option<u64>,
    connect_timeout_ms: Option<u64>,
    operation_timeout_ms: Option<u64>,
    max_body_bytes: Option<u64>,
    ttl: RawTtlSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTtlSettings {
    categories: Option<u64>,
    reviews_latest: Option<u64>,
    reviews_popular: Option<u64>,
    reviews_list: Option<u64>,
    reviews_slug: Option<u64>,
    users_profile: Option<u64>,
    users_reviews: Option<u64>,
    search: Option<u64>,
    sitemap_reviews: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn validate_redis_url(value: String) -> Result<String, LoadError> {
    let parsed = Url::parse(&value)
        .map_err(|err| LoadError::invalid("cache.redis_url", format!("failed to parse: {err}")))?;
    if !REDIS_SCHEMES.contains(&parsed.scheme()) {
        return Err(LoadError::invalid(
            "cache.redis_url",
            format!("unsupported scheme `{}`", parsed.scheme()),
        ));
    }
    Ok(value)
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

fn ttl_seconds(value: Option<u64>, default: u64, key: &'static str) -> Result<u64, LoadError> {
    match value.unwrap_or(default) {
        0 => Err(LoadError::invalid(key, "must be greater than zero")),
        seconds => Ok(seconds),
    }
}

#[cfg(test)]
mod tests;
