//! Token purposes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The purpose a token was minted for, carried in the `mode` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    /// Short-lived bearer credential for API requests.
    AccessToken,
    /// Long-lived credential exchanged for a new pair via rotation.
    RefreshToken,
    /// Single-purpose email verification link.
    VerificationToken,
    /// Single-purpose password reset link.
    ResetPasswordToken,
}

impl TokenMode {
    /// Wire name of the mode, as it appears in the `mode` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::VerificationToken => "verification_token",
            Self::ResetPasswordToken => "reset_password_token",
        }
    }

    /// Key namespace of the liveness marker: the mode without its `_token` suffix.
    ///
    /// Only access and refresh tokens have liveness markers.
    pub fn liveness_prefix(&self) -> Option<&'static str> {
        match self {
            Self::AccessToken => Some("access"),
            Self::RefreshToken => Some("refresh"),
            Self::VerificationToken | Self::ResetPasswordToken => None,
        }
    }

    /// Whether tokens of this mode are tracked in the session store.
    pub fn is_session_bound(&self) -> bool {
        self.liveness_prefix().is_some()
    }
}

impl fmt::Display for TokenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
