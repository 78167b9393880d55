//! CLI command definitions and dispatch.

pub mod health;
pub mod inspect;
pub mod revoke;
pub mod verify;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use sessionguard_auth::TokenServices;
use sessionguard_cache::SessionStoreManager;
use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::traits::SessionStore;

use crate::output::OutputFormat;

/// SessionGuard: token and session operations
#[derive(Debug, Parser)]
#[command(name = "sessionguard", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay: merges `config/default.toml` with `config/{env}.toml`
    #[arg(short, long, conflicts_with = "config")]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Verify a token against the session store
    Verify(verify::VerifyArgs),
    /// Revoke sessions of a user
    Revoke(revoke::RevokeArgs),
    /// List the session keys of a user
    InspectKeys(inspect::InspectArgs),
    /// Check that the session store is reachable
    Health,
}

impl Cli {
    /// Load configuration from `--env` when given, otherwise from `--config`
    pub fn load_config(&self) -> Result<AppConfig, AppError> {
        match &self.env {
            Some(env) => AppConfig::load(env),
            None => AppConfig::load_from(&self.config),
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Verify(args) => verify::execute(args, config, self.format).await,
            Commands::Revoke(args) => revoke::execute(args, config).await,
            Commands::InspectKeys(args) => inspect::execute(args, config, self.format).await,
            Commands::Health => health::execute(config).await,
        }
    }
}

/// Helper: connect to the configured session store
pub async fn connect_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>, AppError> {
    let manager = SessionStoreManager::new(&config.store).await?;
    Ok(Arc::new(manager))
}

/// Helper: build the token components over the configured store
pub async fn token_services(config: &AppConfig) -> Result<TokenServices, AppError> {
    let store = connect_store(config).await?;
    TokenServices::new(&config.tokens, store, config.store.scan_batch_size)
}
