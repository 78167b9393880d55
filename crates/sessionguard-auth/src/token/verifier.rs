//! Bearer-token verification against session store state.
//!
//! A presented token moves through
//! `Decoded → StructurallyValid → (refresh: ReuseChecked → FamilyChecked) →
//! LivenessChecked → Accepted`. Any failed step is terminal.
//!
//! Reuse and family checks run before the liveness match so a replayed
//! refresh token is reported as reuse and tears down the subject's sessions
//! instead of being rejected as merely stale.

use std::sync::Arc;

use tracing::{debug, warn};

use sessionguard_cache::keys;
use sessionguard_core::error::AppError;
use sessionguard_core::traits::SessionStore;
use sessionguard_core::types::{Subject, TokenMode};

use super::{SessionInvalidator, TokenError};
use crate::jwt::{Claims, KeyPurpose, TokenCodec, TokenPayload};

/// Validates access and refresh tokens, and decodes single-purpose tokens.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
    invalidator: SessionInvalidator,
}

impl TokenVerifier {
    /// Creates a verifier; `invalidator` runs the teardown on reuse or a dead family.
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn SessionStore>,
        invalidator: SessionInvalidator,
    ) -> Self {
        Self {
            codec,
            store,
            invalidator,
        }
    }

    /// Verify an access or refresh token, with or without a `Bearer ` prefix.
    pub async fn verify(&self, bearer: &str) -> Result<TokenPayload, TokenError> {
        let token = strip_bearer(bearer);
        let claims = self.codec.decode(token, KeyPurpose::Session)?;

        let (Some(sub), Some(mode), Some(jti), Some(session_id)) = (
            claims.sub.as_ref(),
            claims.mode,
            claims.jti.as_ref(),
            claims.session_id.as_ref(),
        ) else {
            debug!("Token missing required claims");
            return Err(TokenError::StructureInvalid);
        };
        let Some(prefix) = mode.liveness_prefix() else {
            debug!(sub = %sub, mode = %mode, "Token mode not valid for session verification");
            return Err(TokenError::StructureInvalid);
        };

        if mode == TokenMode::RefreshToken {
            self.check_refresh_lineage(sub, &claims).await?;
        }

        let live_key = keys::liveness(prefix, sub, session_id);
        let stored = self
            .store
            .get(&live_key)
            .await
            .map_err(|e| fail_closed(sub, e))?;
        if stored.as_deref() != Some(jti.as_str()) {
            debug!(sub = %sub, session_id = %session_id, mode = %mode, "Liveness check failed");
            return Err(TokenError::LivenessMismatch);
        }

        TokenPayload::try_from(claims)
    }

    /// Verify a token and require a specific session-bound mode.
    pub async fn verify_mode(
        &self,
        bearer: &str,
        expected: TokenMode,
    ) -> Result<TokenPayload, TokenError> {
        let payload = self.verify(bearer).await?;
        if payload.mode() != expected {
            debug!(
                sub = %payload.subject(),
                expected = %expected,
                actual = %payload.mode(),
                "Unexpected token mode"
            );
            return Err(TokenError::StructureInvalid);
        }
        Ok(payload)
    }

    /// Decode a verification or reset-password token with its own secret.
    ///
    /// These tokens have no liveness marker; only signature, expiry, mode and
    /// structure are checked.
    pub fn verify_purpose_token(
        &self,
        token: &str,
        mode: TokenMode,
    ) -> Result<TokenPayload, TokenError> {
        if mode.is_session_bound() {
            return Err(TokenError::StructureInvalid);
        }
        let claims = self
            .codec
            .decode(strip_bearer(token), KeyPurpose::for_mode(mode))?;
        if claims.mode != Some(mode) {
            return Err(TokenError::StructureInvalid);
        }
        TokenPayload::try_from(claims)
    }

    /// Reuse fence, then family marker. Both failures invalidate every
    /// session of the subject before the error propagates.
    async fn check_refresh_lineage(&self, sub: &Subject, claims: &Claims) -> Result<(), TokenError> {
        let Some(jti) = claims.jti.as_ref() else {
            return Err(TokenError::StructureInvalid);
        };

        let reused = self
            .store
            .exists(&keys::used(sub, jti))
            .await
            .map_err(|e| fail_closed(sub, e))?;
        if reused {
            warn!(sub = %sub, kind = "reuse_detected", "Refresh token reuse detected");
            self.invalidator.invalidate_all_best_effort(sub).await;
            return Err(TokenError::ReuseDetected);
        }

        let family_live = match claims.family.as_ref() {
            Some(family) => self
                .store
                .exists(&keys::family(sub, family))
                .await
                .map_err(|e| fail_closed(sub, e))?,
            None => false,
        };
        if !family_live {
            warn!(
                sub = %sub,
                family = ?claims.family,
                kind = "family_invalidated",
                "Refresh token family invalidated"
            );
            self.invalidator.invalidate_all_best_effort(sub).await;
            return Err(TokenError::FamilyInvalidated);
        }

        Ok(())
    }
}

/// Strip an optional case-insensitive `Bearer ` prefix.
pub fn strip_bearer(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => raw[7..].trim_start(),
        _ => raw,
    }
}

/// Store failures during verification reject the token.
fn fail_closed(sub: &Subject, e: AppError) -> TokenError {
    warn!(sub = %sub, error = %e, "Session store unavailable during verification, rejecting token");
    TokenError::LivenessMismatch
}
