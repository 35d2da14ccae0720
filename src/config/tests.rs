use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cache_defaults_match_cache_config() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let config = crate::cache::CacheConfig::from(&settings.cache);
    let defaults = crate::cache::CacheConfig::default();

    assert!(config.enabled);
    assert!(config.redis_url.is_none());
    assert_eq!(config.namespace, defaults.namespace);
    assert_eq!(config.lru_max_items, defaults.lru_max_items);
    assert_eq!(config.scan_batch_size, defaults.scan_batch_size);
    assert_eq!(config.connect_timeout, defaults.connect_timeout);
    assert_eq!(config.operation_timeout, defaults.operation_timeout);
    assert_eq!(config.max_body_bytes, defaults.max_body_bytes);
    assert_eq!(config.ttl, defaults.ttl);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn cache_overrides_apply() {
    let mut raw = RawSettings::default();
    raw.cache.lru_max_items = Some(10);

    let overrides = ServeOverrides {
        cache: CacheOverrides {
            redis_url: Some("redis://cache.internal:6379/0".to_string()),
            namespace: Some("staging".to_string()),
            lru_max_items: Some(50),
            enabled: Some(false),
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.cache.redis_url.as_deref(),
        Some("redis://cache.internal:6379/0")
    );
    assert_eq!(settings.cache.namespace, "staging");
    assert_eq!(settings.cache.lru_max_items.get(), 50);
    assert!(!settings.cache.enabled);
}

#[test]
fn blank_redis_url_means_no_redis() {
    let mut raw = RawSettings::default();
    raw.cache.redis_url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.cache.redis_url.is_none());
}

#[test]
fn non_redis_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.redis_url = Some("postgres://localhost/critica".to_string());

    let err = Settings::from_raw(raw).expect_err("scheme should be rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.redis_url",
            ..
        }
    ));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.ttl.search = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl should be rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.ttl.search",
            ..
        }
    ));
}

#[test]
fn ttl_overrides_keep_other_defaults() {
    let mut raw = RawSettings::default();
    raw.cache.ttl.search = Some(5);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.ttl.search, 5);
    assert_eq!(settings.cache.ttl.categories, TtlTable::default().categories);
}

#[test]
fn namespace_with_separator_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.namespace = Some("critica:v2".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_lru_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.lru_max_items = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity should be rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.lru_max_items",
            ..
        }
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["critica"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "critica",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--cache-redis-url",
        "redis://override",
        "--cache-enabled",
        "false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.cache.redis_url.as_deref(),
                Some("redis://override")
            );
            assert_eq!(serve.overrides.cache.enabled, Some(false));
        }
    }
}
