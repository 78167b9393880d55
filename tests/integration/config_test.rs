//! Shipped configuration loads and builds the token core.

use std::sync::Arc;

use sessionguard_auth::TokenServices;
use sessionguard_cache::MemorySessionStore;
use sessionguard_core::config::AppConfig;

#[test]
fn test_default_config_loads() {
    let config = AppConfig::load_from("config/default.toml").unwrap();
    assert_eq!(config.tokens.algorithm, "HS256");
    assert_eq!(config.store.provider, "redis");
    assert_eq!(config.store.redis.key_prefix, "");
    assert!(config.tokens.used_refresh_ttl() <= config.tokens.refresh_ttl());

    let services = TokenServices::new(
        &config.tokens,
        Arc::new(MemorySessionStore::new()),
        config.store.scan_batch_size,
    );
    assert!(services.is_ok());
}

#[test]
fn test_environment_overlay() {
    let config = AppConfig::load("development").unwrap();
    assert_eq!(config.store.provider, "memory");
    assert_eq!(config.store.scan_batch_size, 10);
    assert_eq!(config.logging.format, "pretty");
    // Untouched sections come from default.toml.
    assert_eq!(config.tokens.access_ttl_minutes, 15);
    assert_eq!(config.store.redis.url, "redis://localhost:6379");
}

#[test]
fn test_unknown_environment_falls_back_to_defaults() {
    let config = AppConfig::load("no-such-env").unwrap();
    assert_eq!(config.store.provider, "redis");
    assert_eq!(config.logging.format, "json");
}
