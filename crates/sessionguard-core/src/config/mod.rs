//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod password;
pub mod store;
pub mod token;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::password::PasswordConfig;
use self::token::TokenConfig;

use crate::error::AppError;

pub use self::store::{RedisStoreConfig, StoreConfig};

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Token secrets, algorithm, and lifetimes.
    pub tokens: TokenConfig,
    /// Session store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Password policy settings.
    #[serde(default)]
    pub password: PasswordConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the named environment.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and environment
    /// variables prefixed with `SESSIONGUARD__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::build(
            config::Config::builder()
                .add_source(config::File::with_name("config/default").required(false))
                .add_source(config::File::with_name(&format!("config/{env}")).required(false)),
            None,
        )
    }

    /// Load configuration from an explicit file path plus environment overrides.
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        Self::build(
            config::Config::builder().add_source(config::File::with_name(path)),
            None,
        )
    }

    /// `env_vars` replaces the process environment when set.
    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        env_vars: Option<config::Map<String, String>>,
    ) -> Result<Self, AppError> {
        let config = builder
            .add_source(
                config::Environment::with_prefix("SESSIONGUARD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env_vars),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.tokens.validate()?;
        self.store.validate()
    }
}
