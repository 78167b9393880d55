//! Listing of a user's session keys.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use sessionguard_cache::keys;
use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::traits::SessionStore;
use sessionguard_core::types::Subject;

use crate::output::{self, OutputFormat};

/// Arguments for the inspect-keys command
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// User ID to inspect
    pub user_id: String,
}

/// Key display row
#[derive(Debug, Serialize, Tabled)]
struct KeyRow {
    /// Namespace
    namespace: String,
    /// Key
    key: String,
    /// Stored value
    value: String,
    /// Remaining TTL in seconds
    ttl_seconds: String,
}

/// Execute the inspect-keys command
pub async fn execute(
    args: &InspectArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let sub = Subject::new(args.user_id.as_str());
    let store = super::connect_store(config).await?;

    let mut rows = Vec::new();
    for namespace in keys::SESSION_NAMESPACES {
        let matched = store
            .scan(&keys::subject_pattern(namespace, &sub), config.store.scan_batch_size)
            .await?;
        for key in matched
            .into_iter()
            .filter(|k| keys::belongs_to(k, namespace, &sub))
        {
            // Keys can expire between the scan and these reads.
            let Some(value) = store.get(&key).await? else {
                continue;
            };
            let ttl = store.ttl_remaining(&key).await?;
            rows.push(KeyRow {
                namespace: namespace.to_string(),
                key,
                value,
                ttl_seconds: ttl.map_or_else(|| "-".to_string(), |d| d.as_secs().to_string()),
            });
        }
    }

    output::print_list(&rows, format);
    Ok(())
}
