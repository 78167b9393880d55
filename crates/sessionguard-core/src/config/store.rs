//! Session store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Top-level session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store provider type: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Upper bound for a single store round-trip, in milliseconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
    /// `COUNT` hint for each cursor step when enumerating keys.
    #[serde(default = "default_scan_batch")]
    pub scan_batch_size: usize,
    /// Redis-specific settings.
    #[serde(default)]
    pub redis: RedisStoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            command_timeout_ms: default_command_timeout(),
            scan_batch_size: default_scan_batch(),
            redis: RedisStoreConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Upper bound for one store round-trip.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Rejects zero timeouts and batch sizes.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.command_timeout_ms == 0 {
            return Err(AppError::configuration(
                "store.command_timeout_ms must be greater than zero",
            ));
        }
        if self.scan_batch_size == 0 {
            return Err(AppError::configuration(
                "store.scan_batch_size must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Redis backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix prepended to every key. Empty keeps the bare key schema.
    #[serde(default)]
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: String::new(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_command_timeout() -> u64 {
    500
}

fn default_scan_batch() -> usize {
    100
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
