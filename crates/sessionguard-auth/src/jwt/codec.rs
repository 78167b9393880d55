//! Signed-token encoding and decoding with per-purpose secrets.

use std::str::FromStr;

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use sessionguard_core::config::token::TokenConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::types::TokenMode;

use super::claims::Claims;
use crate::token::TokenError;

/// Which secret a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Access and refresh tokens.
    Session,
    /// Email-verification tokens.
    Verification,
    /// Password-reset tokens.
    ResetPassword,
}

impl KeyPurpose {
    /// The secret a token of `mode` is signed with.
    pub fn for_mode(mode: TokenMode) -> Self {
        match mode {
            TokenMode::AccessToken | TokenMode::RefreshToken => Self::Session,
            TokenMode::VerificationToken => Self::Verification,
            TokenMode::ResetPasswordToken => Self::ResetPassword,
        }
    }
}

/// Signing and verification keys for one purpose.
struct PurposeKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl PurposeKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Encodes and decodes signed tokens. Pure: no store access.
pub struct TokenCodec {
    /// Fixed signing algorithm.
    algorithm: Algorithm,
    /// Validation configuration shared by every purpose.
    validation: Validation,
    session: PurposeKeys,
    verification: PurposeKeys,
    reset_password: PurposeKeys,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("leeway", &self.validation.leeway)
            .finish()
    }
}

impl TokenCodec {
    /// Creates a codec from token configuration.
    pub fn new(config: &TokenConfig) -> Result<Self, AppError> {
        config.validate()?;
        let algorithm = parse_algorithm(&config.algorithm)?;

        Ok(Self {
            algorithm,
            validation: validation(algorithm, config.leeway_seconds),
            session: PurposeKeys::from_secret(&config.access_secret),
            verification: PurposeKeys::from_secret(&config.verification_secret),
            reset_password: PurposeKeys::from_secret(&config.reset_password_secret),
        })
    }

    fn keys(&self, purpose: KeyPurpose) -> &PurposeKeys {
        match purpose {
            KeyPurpose::Session => &self.session,
            KeyPurpose::Verification => &self.verification,
            KeyPurpose::ResetPassword => &self.reset_password,
        }
    }

    /// Signs claims with the secret of their mode.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let mode = claims.mode.ok_or(TokenError::StructureInvalid)?;
        encode(
            &Header::new(self.algorithm),
            claims,
            &self.keys(KeyPurpose::for_mode(mode)).encoding,
        )
        .map_err(|e| TokenError::Internal(AppError::internal(format!("Failed to encode token: {e}"))))
    }

    /// Verifies the signature and expiry of a token signed for `purpose`.
    ///
    /// A token signed with another purpose's secret fails as `Malformed`.
    pub fn decode(&self, token: &str, purpose: KeyPurpose) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys(purpose).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, AppError> {
    Algorithm::from_str(name)
        .map_err(|e| AppError::configuration(format!("Unknown token algorithm '{name}': {e}")))
}

fn validation(algorithm: Algorithm, leeway_seconds: u64) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.leeway = leeway_seconds;
    validation
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        JwtErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
