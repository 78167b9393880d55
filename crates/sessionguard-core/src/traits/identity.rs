//! Collaborators owned outside the token core: identity lookup and
//! password hashing.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::Subject;

/// The parts of a user record the session flows need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Opaque user identifier; becomes the token `sub`.
    pub id: Subject,
    /// Contact address embedded in verification and reset tokens.
    pub email: String,
    /// Stored password hash.
    pub password_hash: String,
    /// `false` when the account is blocked.
    pub is_active: bool,
    /// Whether the email address has been confirmed.
    pub is_verified: bool,
}

/// Identity lookup and the few mutations the session flows perform.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Find a user by identifier.
    async fn find_user_by_id(&self, id: &Subject) -> AppResult<Option<UserRecord>>;

    /// Replace a user's password hash. Returns `false` if the user does not exist.
    async fn update_password_hash(&self, id: &Subject, password_hash: &str) -> AppResult<bool>;

    /// Mark a user's email as verified. Returns `false` if the user does not exist.
    async fn mark_verified(&self, id: &Subject) -> AppResult<bool>;
}

/// Black-box password hashing.
pub trait PasswordHashing: Send + Sync + std::fmt::Debug + 'static {
    /// Hash a plaintext password.
    fn hash(&self, plaintext: &str) -> AppResult<String>;

    /// Check a plaintext password against a stored hash.
    fn verify(&self, plaintext: &str, hash: &str) -> AppResult<bool>;
}
