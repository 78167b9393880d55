//! Shared domain types.

pub mod id;
pub mod mode;

pub use id::{FamilyId, SessionId, Subject, TokenId};
pub use mode::TokenMode;
