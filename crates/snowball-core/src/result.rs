//! Convenience result type alias for Snowball.

use crate::error::AppError;

/// A specialized `Result` type for Snowball operations.
pub type AppResult<T> = Result<T, AppError>;
