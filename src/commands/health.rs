//! Store health check.

use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::traits::SessionStore;

use crate::output;

/// Execute the health command
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let store = super::connect_store(config).await?;
    if store.health_check().await? {
        output::print_success(&format!("Session store '{}' is healthy", config.store.provider));
        Ok(())
    } else {
        Err(AppError::cache("Session store did not answer PING"))
    }
}
