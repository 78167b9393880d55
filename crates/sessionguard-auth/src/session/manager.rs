//! Session lifecycle manager: login, refresh, logout, and the password and
//! email flows that end or authorise sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use sessionguard_cache::keys;
use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{PasswordHashing, SessionStore, UserDirectory, UserRecord};
use sessionguard_core::types::{SessionId, Subject, TokenMode};

use crate::jwt::Claims;
use crate::password::PasswordValidator;
use crate::token::verifier::strip_bearer;
use crate::token::{TokenError, TokenServices};

/// Access and refresh tokens handed to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Session shared by both tokens.
    pub session_id: SessionId,
    /// Access token expiration timestamp.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration timestamp.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Orchestrates the account flows over the token core.
#[derive(Clone)]
pub struct SessionManager {
    tokens: TokenServices,
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHashing>,
    validator: PasswordValidator,
    /// How long a redeemed reset token stays fenced.
    reset_ttl: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("validator", &self.validator)
            .field("reset_ttl", &self.reset_ttl)
            .finish()
    }
}

impl SessionManager {
    /// Creates a session manager with all required dependencies.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        hasher: Arc<dyn PasswordHashing>,
    ) -> AppResult<Self> {
        let tokens = TokenServices::new(&config.tokens, store.clone(), config.store.scan_batch_size)?;
        Ok(Self {
            tokens,
            store,
            users,
            hasher,
            validator: PasswordValidator::new(&config.password),
            reset_ttl: config.tokens.reset_password_ttl(),
        })
    }

    /// The underlying token components.
    pub fn tokens(&self) -> &TokenServices {
        &self.tokens
    }

    /// Performs the login flow:
    ///
    /// 1. Look up the user and verify the password
    /// 2. Reject unverified and blocked users
    /// 3. Mint a refresh token in a new session and family
    /// 4. Mint an access token in the same session
    pub async fn login(&self, user_id: &Subject, password: &str) -> AppResult<TokenPair> {
        let Some(user) = self.users.find_user_by_id(user_id).await? else {
            debug!(sub = %user_id, "Login for unknown user");
            return Err(AppError::unauthorized("Incorrect password or user"));
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(sub = %user_id, "Login with incorrect password");
            return Err(AppError::unauthorized("Incorrect password or user"));
        }

        check_user_status(&user)?;

        let refresh = self
            .tokens
            .issuer
            .issue_refresh_token(&user.id, None, None)
            .await
            .map_err(|e| rejected("login", e))?;
        let pair = self
            .pair_for(
                &user.id,
                refresh.token,
                refresh.payload.expires_at(),
                refresh.payload.session_id().cloned(),
            )
            .await?;

        info!(sub = %user.id, session_id = %pair.session_id, "Login successful");
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair.
    ///
    /// 1. Verify the bearer as a refresh token
    /// 2. Re-check user state
    /// 3. Rotate within the family
    /// 4. Mint an access token bound to the rotated session
    pub async fn refresh(&self, bearer: &str) -> AppResult<TokenPair> {
        let payload = self
            .tokens
            .verifier
            .verify_mode(bearer, TokenMode::RefreshToken)
            .await
            .map_err(|e| rejected("refresh", e))?;

        let user = self.require_user(payload.subject()).await?;
        check_user_status(&user)?;

        let rotated = self
            .tokens
            .rotation
            .rotate(&Claims::from(payload))
            .await
            .map_err(|e| rejected("refresh", e))?;
        let pair = self
            .pair_for(
                &user.id,
                rotated.token,
                rotated.payload.expires_at(),
                rotated.payload.session_id().cloned(),
            )
            .await?;

        info!(sub = %user.id, session_id = %pair.session_id, "Token refreshed");
        Ok(pair)
    }

    /// Ends the session of an access token.
    pub async fn logout(&self, bearer: &str) -> AppResult<()> {
        let payload = self
            .tokens
            .verifier
            .verify_mode(bearer, TokenMode::AccessToken)
            .await
            .map_err(|e| rejected("logout", e))?;
        let Some(session_id) = payload.session_id() else {
            return Err(rejected("logout", TokenError::StructureInvalid));
        };

        self.tokens
            .invalidator
            .invalidate_session(payload.subject(), session_id)
            .await?;
        info!(sub = %payload.subject(), session_id = %session_id, "Logout completed");
        Ok(())
    }

    /// Ends every session of a user. Returns the number of keys removed.
    pub async fn logout_everywhere(&self, sub: &Subject) -> AppResult<u64> {
        self.tokens.invalidator.invalidate_all(sub).await
    }

    /// Changes a password after checking the current one, then ends every
    /// session of the user.
    pub async fn change_password(
        &self,
        sub: &Subject,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .users
            .find_user_by_id(sub)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if !self.hasher.verify(current_password, &user.password_hash)? {
            return Err(AppError::unauthorized("Current password is incorrect"));
        }
        self.validator
            .validate_not_same(current_password, new_password)?;
        self.validator.validate(new_password)?;

        self.replace_password(&user.id, new_password).await?;
        info!(sub = %user.id, "Password changed");
        Ok(())
    }

    /// Mints an email-verification token for a user. Delivery is the caller's job.
    pub async fn issue_email_verification(&self, sub: &Subject) -> AppResult<String> {
        let user = self
            .users
            .find_user_by_id(sub)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if user.is_verified {
            return Err(AppError::validation("User is already verified"));
        }

        let issued = self
            .tokens
            .issuer
            .issue_verification_token(&user.id, Some(user.email.as_str()))?;
        Ok(issued.token)
    }

    /// Marks the token's user as verified. Idempotent.
    pub async fn verify_email(&self, token: &str) -> AppResult<Subject> {
        let payload = self
            .tokens
            .verifier
            .verify_purpose_token(token, TokenMode::VerificationToken)
            .map_err(|e| rejected("verify_email", e))?;
        let sub = payload.subject().clone();

        if !self.users.mark_verified(&sub).await? {
            return Err(AppError::not_found("User not found"));
        }
        info!(sub = %sub, "Email verified");
        Ok(sub)
    }

    /// Mints a password-reset token for a user. Delivery is the caller's job.
    pub async fn request_password_reset(&self, sub: &Subject) -> AppResult<String> {
        let user = self
            .users
            .find_user_by_id(sub)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let issued = self
            .tokens
            .issuer
            .issue_reset_password_token(&user.id, Some(user.email.as_str()))?;
        Ok(issued.token)
    }

    /// Sets a new password from a reset token, then ends every session of
    /// the user. Each reset token can be redeemed once; if the password
    /// update or the session sweep fails, the token stays redeemable.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        let payload = self
            .tokens
            .verifier
            .verify_purpose_token(token, TokenMode::ResetPasswordToken)
            .map_err(|e| rejected("confirm_password_reset", e))?;
        let sub = payload.subject().clone();

        // Policy first, so a rejected password does not burn the token.
        self.validator.validate(new_password)?;

        let digest = format!("{:x}", Sha256::digest(strip_bearer(token).as_bytes()));
        let marker = keys::redeemed(&sub, &digest);
        let first_use = self
            .store
            .set_if_absent(&marker, "redeemed", self.reset_ttl)
            .await?;
        if !first_use {
            return Err(rejected(
                "confirm_password_reset",
                TokenError::AlreadyCompleted,
            ));
        }

        if let Err(e) = self.replace_password(&sub, new_password).await {
            if let Err(release) = self.store.delete(std::slice::from_ref(&marker)).await {
                warn!(sub = %sub, error = %release, "Failed to release reset token after error");
            }
            return Err(e);
        }
        info!(sub = %sub, "Password reset completed");
        Ok(())
    }

    /// Resolves the user behind an access token.
    pub async fn authenticate(&self, bearer: &str) -> AppResult<UserRecord> {
        let payload = self
            .tokens
            .verifier
            .verify_mode(bearer, TokenMode::AccessToken)
            .await
            .map_err(|e| rejected("authenticate", e))?;

        let user = self.require_user(payload.subject()).await?;
        if !user.is_active {
            return Err(AppError::forbidden("User is blocked"));
        }
        Ok(user)
    }

    async fn require_user(&self, sub: &Subject) -> AppResult<UserRecord> {
        self.users
            .find_user_by_id(sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("User not found"))
    }

    async fn replace_password(&self, sub: &Subject, new_password: &str) -> AppResult<()> {
        let hash = self.hasher.hash(new_password)?;
        if !self.users.update_password_hash(sub, &hash).await? {
            return Err(AppError::not_found("User not found"));
        }
        self.tokens.invalidator.invalidate_all(sub).await?;
        Ok(())
    }

    /// Mint an access token in the refresh token's session and assemble the pair.
    async fn pair_for(
        &self,
        sub: &Subject,
        refresh_token: String,
        refresh_expires_at: DateTime<Utc>,
        session_id: Option<SessionId>,
    ) -> AppResult<TokenPair> {
        let Some(session_id) = session_id else {
            return Err(AppError::internal("Refresh token has no session"));
        };
        let access = self
            .tokens
            .issuer
            .issue_access_token(sub, Some(session_id.clone()))
            .await
            .map_err(|e| rejected("issue", e))?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            session_id,
            access_expires_at: access.payload.expires_at(),
            refresh_expires_at,
        })
    }
}

/// Checks the user may hold a session.
fn check_user_status(user: &UserRecord) -> AppResult<()> {
    if !user.is_verified {
        info!(sub = %user.id, "Unverified user rejected");
        return Err(AppError::validation("User is not verified"));
    }
    if !user.is_active {
        info!(sub = %user.id, "Blocked user rejected");
        return Err(AppError::forbidden("User is blocked"));
    }
    Ok(())
}

/// Log the specific rejection reason, then collapse it.
fn rejected(flow: &'static str, err: TokenError) -> AppError {
    if err.is_compromise_signal() {
        warn!(flow, kind = err.kind(), "Token rejected on suspected compromise");
    } else {
        debug!(flow, kind = err.kind(), "Token rejected");
    }
    err.into()
}
