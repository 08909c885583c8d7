//! Convenience result type alias for Hookgate.

use crate::error::AppError;

/// A specialized `Result` type for Hookgate host operations.
pub type AppResult<T> = Result<T, AppError>;
