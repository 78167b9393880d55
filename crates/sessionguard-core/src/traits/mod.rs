//! Trait seams between the token core and its collaborators.

pub mod identity;
pub mod session_store;

pub use identity::{PasswordHashing, UserDirectory, UserRecord};
pub use session_store::{ScanPage, SessionStore, StoreScript};
