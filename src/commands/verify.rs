//! Token verification.

use clap::{Args, ValueEnum};
use serde::Serialize;
use tabled::Tabled;

use sessionguard_auth::{TokenError, TokenPayload};
use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::types::TokenMode;

use crate::output::{self, OutputFormat};

/// Which secret and checks to apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TokenKind {
    /// Access or refresh token, checked against the session store
    #[default]
    Session,
    /// Email-verification token
    Verification,
    /// Password-reset token
    ResetPassword,
}

/// Arguments for the verify command
///
/// Verifying a consumed refresh token is treated as reuse and revokes every
/// session of its user, exactly as a client presentation would.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Token, with or without a `Bearer ` prefix
    pub token: String,

    /// Kind of token
    #[arg(long, value_enum, default_value = "session")]
    pub kind: TokenKind,
}

/// Verified token display row
#[derive(Debug, Serialize, Tabled)]
struct PayloadRow {
    /// Subject
    sub: String,
    /// Mode
    mode: String,
    /// Session ID
    session_id: String,
    /// Token ID
    jti: String,
    /// Expiration
    expires_at: String,
}

impl From<&TokenPayload> for PayloadRow {
    fn from(payload: &TokenPayload) -> Self {
        let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
        Self {
            sub: payload.subject().to_string(),
            mode: payload.mode().to_string(),
            session_id: or_dash(payload.session_id().map(|s| s.to_string())),
            jti: or_dash(payload.jti().map(|j| j.to_string())),
            expires_at: payload.expires_at().to_rfc3339(),
        }
    }
}

/// Execute the verify command
pub async fn execute(
    args: &VerifyArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::token_services(config).await?;

    let result = match args.kind {
        TokenKind::Session => services.verifier.verify(&args.token).await,
        TokenKind::Verification => services
            .verifier
            .verify_purpose_token(&args.token, TokenMode::VerificationToken),
        TokenKind::ResetPassword => services
            .verifier
            .verify_purpose_token(&args.token, TokenMode::ResetPasswordToken),
    };

    match result {
        Ok(payload) => {
            output::print_item(&PayloadRow::from(&payload), format);
            Ok(())
        }
        Err(TokenError::Internal(e)) => Err(e),
        Err(e) => {
            output::print_error(&format!("Token rejected: {e} ({})", e.kind()));
            Err(e.into())
        }
    }
}
