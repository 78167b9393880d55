//! Token claim schema.
//!
//! [`Claims`] is the wire shape: a flat JSON object whose optional fields
//! depend on `mode`. [`TokenPayload`] is the checked form, with the fields
//! each mode requires enforced once at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sessionguard_core::types::{FamilyId, SessionId, Subject, TokenId, TokenMode};

use crate::token::TokenError;

/// Claims as they are signed and transported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Subject>,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Token purpose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TokenMode>,
    /// Token instance ID (access/refresh only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<TokenId>,
    /// Session this token belongs to (access/refresh only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Refresh lineage (refresh only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<FamilyId>,
    /// Address the token was sent to (verification/reset only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Claims of an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject (user ID).
    pub sub: Subject,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Token instance ID, matched against the liveness key.
    pub jti: TokenId,
    /// Session the token belongs to.
    pub session_id: SessionId,
}

/// Claims of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject (user ID).
    pub sub: Subject,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Token instance ID, fenced in `used:` once rotated.
    pub jti: TokenId,
    /// Session the token belongs to; changes on every rotation.
    pub session_id: SessionId,
    /// Rotation lineage shared by every descendant of one login.
    pub family: FamilyId,
}

/// Claims of a verification or password-reset token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurposeClaims {
    /// Subject (user ID).
    pub sub: Subject,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Address the link was sent to.
    pub email: Option<String>,
}

/// A structurally valid token payload, discriminated by mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPayload {
    Access(SessionClaims),
    Refresh(RefreshClaims),
    Verification(PurposeClaims),
    ResetPassword(PurposeClaims),
}

impl TokenPayload {
    /// Mode the payload was decoded as.
    pub fn mode(&self) -> TokenMode {
        match self {
            Self::Access(_) => TokenMode::AccessToken,
            Self::Refresh(_) => TokenMode::RefreshToken,
            Self::Verification(_) => TokenMode::VerificationToken,
            Self::ResetPassword(_) => TokenMode::ResetPasswordToken,
        }
    }

    /// User the token was issued to.
    pub fn subject(&self) -> &Subject {
        match self {
            Self::Access(c) => &c.sub,
            Self::Refresh(c) => &c.sub,
            Self::Verification(c) | Self::ResetPassword(c) => &c.sub,
        }
    }

    /// Expiration as a Unix timestamp.
    pub fn exp(&self) -> i64 {
        match self {
            Self::Access(c) => c.exp,
            Self::Refresh(c) => c.exp,
            Self::Verification(c) | Self::ResetPassword(c) => c.exp,
        }
    }

    /// Session of an access or refresh token.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Access(c) => Some(&c.session_id),
            Self::Refresh(c) => Some(&c.session_id),
            Self::Verification(_) | Self::ResetPassword(_) => None,
        }
    }

    /// Instance ID of an access or refresh token.
    pub fn jti(&self) -> Option<&TokenId> {
        match self {
            Self::Access(c) => Some(&c.jti),
            Self::Refresh(c) => Some(&c.jti),
            Self::Verification(_) | Self::ResetPassword(_) => None,
        }
    }

    /// Expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp(), 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// The refresh claims, if this is a refresh token.
    pub fn into_refresh(self) -> Option<RefreshClaims> {
        match self {
            Self::Refresh(c) => Some(c),
            _ => None,
        }
    }
}

impl TryFrom<Claims> for TokenPayload {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let sub = claims.sub.ok_or(TokenError::StructureInvalid)?;
        let mode = claims.mode.ok_or(TokenError::StructureInvalid)?;
        let exp = claims.exp;

        match mode {
            TokenMode::AccessToken => Ok(Self::Access(SessionClaims {
                sub,
                exp,
                jti: claims.jti.ok_or(TokenError::StructureInvalid)?,
                session_id: claims.session_id.ok_or(TokenError::StructureInvalid)?,
            })),
            TokenMode::RefreshToken => Ok(Self::Refresh(RefreshClaims {
                sub,
                exp,
                jti: claims.jti.ok_or(TokenError::StructureInvalid)?,
                session_id: claims.session_id.ok_or(TokenError::StructureInvalid)?,
                family: claims.family.ok_or(TokenError::StructureInvalid)?,
            })),
            TokenMode::VerificationToken => Ok(Self::Verification(PurposeClaims {
                sub,
                exp,
                email: claims.email,
            })),
            TokenMode::ResetPasswordToken => Ok(Self::ResetPassword(PurposeClaims {
                sub,
                exp,
                email: claims.email,
            })),
        }
    }
}

impl From<TokenPayload> for Claims {
    fn from(payload: TokenPayload) -> Self {
        let mode = Some(payload.mode());
        match payload {
            TokenPayload::Access(c) => Claims {
                sub: Some(c.sub),
                exp: c.exp,
                mode,
                jti: Some(c.jti),
                session_id: Some(c.session_id),
                family: None,
                email: None,
            },
            TokenPayload::Refresh(c) => Claims {
                sub: Some(c.sub),
                exp: c.exp,
                mode,
                jti: Some(c.jti),
                session_id: Some(c.session_id),
                family: Some(c.family),
                email: None,
            },
            TokenPayload::Verification(c) | TokenPayload::ResetPassword(c) => Claims {
                sub: Some(c.sub),
                exp: c.exp,
                mode,
                jti: None,
                session_id: None,
                family: None,
                email: c.email,
            },
        }
    }
}

impl From<RefreshClaims> for Claims {
    fn from(claims: RefreshClaims) -> Self {
        TokenPayload::Refresh(claims).into()
    }
}
