//! Token failure taxonomy.

use sessionguard_core::error::{AppError, ErrorKind};

/// Why a token was rejected.
///
/// Every variant except [`TokenError::Internal`] collapses to one generic
/// authentication failure at the outer boundary; the variant itself is
/// kept for logs.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signature valid, `exp` elapsed.
    #[error("token expired")]
    Expired,

    /// Signature or encoding invalid.
    #[error("invalid token")]
    Malformed,

    /// A claim required by the token's mode is missing.
    #[error("invalid token structure")]
    StructureInvalid,

    /// A refresh token consumed by an earlier rotation was presented again.
    #[error("token reuse detected")]
    ReuseDetected,

    /// The refresh family marker is absent.
    #[error("token family invalidated")]
    FamilyInvalidated,

    /// The store holds no live `jti` for the session, or a different one.
    #[error("token invalidated or expired")]
    LivenessMismatch,

    /// A single-use token was redeemed twice.
    #[error("operation already completed")]
    AlreadyCompleted,

    /// Store or encoding failure outside the token taxonomy.
    #[error("token processing failed: {0}")]
    Internal(#[from] AppError),
}

impl TokenError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Malformed => "malformed",
            Self::StructureInvalid => "structure_invalid",
            Self::ReuseDetected => "reuse_detected",
            Self::FamilyInvalidated => "family_invalidated",
            Self::LivenessMismatch => "liveness_mismatch",
            Self::AlreadyCompleted => "already_completed",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this failure triggers invalidation of every session of the subject.
    pub fn is_compromise_signal(&self) -> bool {
        matches!(self, Self::ReuseDetected | Self::FamilyInvalidated)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Internal(inner) => inner,
            other => AppError::with_source(ErrorKind::Authentication, "Authentication failed", other),
        }
    }
}
