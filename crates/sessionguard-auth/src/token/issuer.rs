//! Token issuance.
//!
//! Access and refresh issuance only ever writes to the store; it never
//! reads prior state, so concurrent logins for one subject produce
//! independent sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use sessionguard_cache::keys;
use sessionguard_core::config::token::TokenConfig;
use sessionguard_core::traits::SessionStore;
use sessionguard_core::types::{FamilyId, SessionId, Subject, TokenId};

use super::TokenError;
use crate::jwt::claims::{PurposeClaims, RefreshClaims, SessionClaims};
use crate::jwt::{Claims, TokenCodec, TokenPayload};

/// A freshly minted token and the payload it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact signed token string.
    pub token: String,
    /// The claims signed into `token`.
    pub payload: TokenPayload,
}

/// Mints tokens and records liveness markers for session-bound ones.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    verification_ttl: Duration,
    reset_password_ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer with lifetimes taken from `config`.
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn SessionStore>, config: &TokenConfig) -> Self {
        Self {
            codec,
            store,
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
            verification_ttl: config.verification_ttl(),
            reset_password_ttl: config.reset_password_ttl(),
        }
    }

    /// Issues an access token, starting a new session when `session_id` is `None`.
    ///
    /// Records `access:{sub}:{session_id} = jti` for the access TTL.
    pub async fn issue_access_token(
        &self,
        sub: &Subject,
        session_id: Option<SessionId>,
    ) -> Result<IssuedToken, TokenError> {
        let session_id = session_id.unwrap_or_else(SessionId::generate);
        let jti = TokenId::generate();
        let payload = TokenPayload::Access(SessionClaims {
            sub: sub.clone(),
            exp: expiry(self.access_ttl),
            jti: jti.clone(),
            session_id: session_id.clone(),
        });
        let token = self.codec.encode(&Claims::from(payload.clone()))?;

        self.store
            .set(&keys::access(sub, &session_id), jti.as_str(), self.access_ttl)
            .await?;

        debug!(sub = %sub, session_id = %session_id, "Access token issued");
        Ok(IssuedToken { token, payload })
    }

    /// Issues a refresh token.
    ///
    /// A missing `session_id` or `family` is generated. Records the refresh
    /// liveness marker and (re)writes `family:{sub}:{family} = "active"`,
    /// both for the full refresh TTL.
    pub async fn issue_refresh_token(
        &self,
        sub: &Subject,
        session_id: Option<SessionId>,
        family: Option<FamilyId>,
    ) -> Result<IssuedToken, TokenError> {
        let session_id = session_id.unwrap_or_else(SessionId::generate);
        let family = family.unwrap_or_else(FamilyId::generate);
        let jti = TokenId::generate();
        let payload = TokenPayload::Refresh(RefreshClaims {
            sub: sub.clone(),
            exp: expiry(self.refresh_ttl),
            jti: jti.clone(),
            session_id: session_id.clone(),
            family: family.clone(),
        });
        let token = self.codec.encode(&Claims::from(payload.clone()))?;

        self.store
            .set(&keys::refresh(sub, &session_id), jti.as_str(), self.refresh_ttl)
            .await?;
        self.store
            .set(&keys::family(sub, &family), keys::FAMILY_ACTIVE, self.refresh_ttl)
            .await?;

        debug!(
            sub = %sub,
            session_id = %session_id,
            family = %family,
            "Refresh token issued"
        );
        Ok(IssuedToken { token, payload })
    }

    /// Issues a stateless email-verification token.
    pub fn issue_verification_token(
        &self,
        sub: &Subject,
        email: Option<&str>,
    ) -> Result<IssuedToken, TokenError> {
        let payload = TokenPayload::Verification(self.purpose_claims(sub, email, self.verification_ttl));
        self.sign(payload)
    }

    /// Issues a stateless password-reset token.
    pub fn issue_reset_password_token(
        &self,
        sub: &Subject,
        email: Option<&str>,
    ) -> Result<IssuedToken, TokenError> {
        let payload =
            TokenPayload::ResetPassword(self.purpose_claims(sub, email, self.reset_password_ttl));
        self.sign(payload)
    }

    fn purpose_claims(&self, sub: &Subject, email: Option<&str>, ttl: Duration) -> PurposeClaims {
        PurposeClaims {
            sub: sub.clone(),
            exp: expiry(ttl),
            email: email.map(str::to_string),
        }
    }

    fn sign(&self, payload: TokenPayload) -> Result<IssuedToken, TokenError> {
        let token = self.codec.encode(&Claims::from(payload.clone()))?;
        Ok(IssuedToken { token, payload })
    }
}

fn expiry(ttl: Duration) -> i64 {
    Utc::now().timestamp().saturating_add(ttl.as_secs() as i64)
}
