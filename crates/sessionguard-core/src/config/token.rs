//! Token secrets, signing algorithm, and lifetimes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Signing algorithms accepted for shared-secret tokens.
const HMAC_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Configuration for every token purpose.
///
/// Access and refresh tokens share `access_secret`; verification and
/// password-reset tokens each get their own secret so a token minted for
/// one purpose never decodes under another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Secret for access and refresh tokens.
    pub access_secret: String,
    /// Secret for email-verification tokens.
    pub verification_secret: String,
    /// Secret for password-reset tokens.
    pub reset_password_secret: String,
    /// JWT algorithm name.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in minutes.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_minutes: u64,
    /// Verification token TTL in minutes.
    #[serde(default = "default_verification_ttl")]
    pub verification_ttl_minutes: u64,
    /// Password-reset token TTL in minutes.
    #[serde(default = "default_reset_ttl")]
    pub reset_password_ttl_minutes: u64,
    /// How long a consumed refresh `jti` stays fenced, in seconds.
    #[serde(default = "default_used_ttl")]
    pub used_refresh_ttl_seconds: u64,
    /// Clock-skew allowance when checking `exp`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl TokenConfig {
    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_minutes * 60)
    }

    /// Refresh token and family marker lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_minutes * 60)
    }

    /// Verification token lifetime.
    pub fn verification_ttl(&self) -> Duration {
        Duration::from_secs(self.verification_ttl_minutes * 60)
    }

    /// Password-reset token lifetime.
    pub fn reset_password_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_password_ttl_minutes * 60)
    }

    /// TTL of the replay fence, never longer than a refresh token can live.
    pub fn used_refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.used_refresh_ttl_seconds).min(self.refresh_ttl())
    }

    /// Rejects configurations that would weaken token separation.
    pub fn validate(&self) -> Result<(), AppError> {
        let secrets = [
            ("access_secret", &self.access_secret),
            ("verification_secret", &self.verification_secret),
            ("reset_password_secret", &self.reset_password_secret),
        ];
        for (name, secret) in secrets {
            if secret.trim().is_empty() {
                return Err(AppError::configuration(format!(
                    "tokens.{name} must not be empty"
                )));
            }
        }

        if self.access_secret == self.verification_secret
            || self.access_secret == self.reset_password_secret
            || self.verification_secret == self.reset_password_secret
        {
            return Err(AppError::configuration(
                "tokens secrets must differ between access, verification, and reset purposes",
            ));
        }

        if !HMAC_ALGORITHMS.contains(&self.algorithm.as_str()) {
            return Err(AppError::configuration(format!(
                "Unsupported token algorithm '{}'. Supported: {}",
                self.algorithm,
                HMAC_ALGORITHMS.join(", ")
            )));
        }

        let ttls = [
            ("access_ttl_minutes", self.access_ttl_minutes),
            ("refresh_ttl_minutes", self.refresh_ttl_minutes),
            ("verification_ttl_minutes", self.verification_ttl_minutes),
            ("reset_password_ttl_minutes", self.reset_password_ttl_minutes),
            ("used_refresh_ttl_seconds", self.used_refresh_ttl_seconds),
        ];
        for (name, value) in ttls {
            if value == 0 {
                return Err(AppError::configuration(format!(
                    "tokens.{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    60 * 24 * 7
}

fn default_verification_ttl() -> u64 {
    60 * 24
}

fn default_reset_ttl() -> u64 {
    30
}

fn default_used_ttl() -> u64 {
    60 * 60 * 24
}

fn default_leeway() -> u64 {
    5
}
