//! # sessionguard-auth
//!
//! Token lifecycle and session security for SessionGuard.
//!
//! ## Modules
//!
//! - `jwt`: claim schema and signed-token encoding/decoding per purpose
//! - `token`: issuance, verification, atomic rotation, and mass invalidation
//! - `password`: Argon2id password hashing and policy enforcement
//! - `session`: account flows (login, refresh, logout, password change/reset)

pub mod jwt;
pub mod password;
pub mod session;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use jwt::{Claims, KeyPurpose, TokenCodec, TokenPayload};
pub use password::{PasswordHasher, PasswordValidator};
pub use session::{SessionManager, TokenPair};
pub use token::{
    IssuedToken, RotationCoordinator, SessionInvalidator, TokenError, TokenIssuer, TokenServices,
    TokenVerifier,
};
