//! Session revocation.

use clap::Args;

use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::types::{SessionId, Subject};

use crate::output;

/// Arguments for the revoke command
#[derive(Debug, Args)]
pub struct RevokeArgs {
    /// User ID whose sessions are revoked
    pub user_id: String,

    /// Revoke only this session instead of every session
    #[arg(long)]
    pub session: Option<String>,

    /// Skip confirmation
    #[arg(long)]
    pub force: bool,
}

/// Execute the revoke command
pub async fn execute(args: &RevokeArgs, config: &AppConfig) -> Result<(), AppError> {
    let sub = Subject::new(args.user_id.as_str());
    let services = super::token_services(config).await?;

    if let Some(session) = &args.session {
        let deleted = services
            .invalidator
            .invalidate_session(&sub, &SessionId::new(session.as_str()))
            .await?;
        output::print_success(&format!("Session {session} revoked ({deleted} keys removed)"));
        return Ok(());
    }

    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Revoke ALL sessions of user '{sub}'?"))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = services.invalidator.invalidate_all(&sub).await?;
    output::print_success(&format!(
        "All sessions of user '{sub}' revoked ({deleted} keys removed)"
    ));
    Ok(())
}
