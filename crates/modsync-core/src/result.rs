//! Convenience result type alias for ModSync.

use crate::error::AppError;

/// A specialized `Result` type for ModSync operations.
pub type AppResult<T> = Result<T, AppError>;
