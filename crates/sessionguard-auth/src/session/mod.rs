//! Account flows built on the token core.

pub mod manager;

pub use manager::{SessionManager, TokenPair};
