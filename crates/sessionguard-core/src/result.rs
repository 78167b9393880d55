//! Convenience result type alias for SessionGuard.

use crate::error::AppError;

/// A specialized `Result` type for SessionGuard operations.
pub type AppResult<T> = Result<T, AppError>;
