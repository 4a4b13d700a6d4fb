//! Error types for checkpoint operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by a checkpoint check.
///
/// None of these imply the watermark changed. No retry is attempted; the
/// caller decides.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The shared store could not be reached.
    #[error("checkpoint store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but the operation failed.
    #[error("checkpoint store error: {0}")]
    Store(String),

    /// The timestamp cannot be represented as epoch nanoseconds.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(DateTime<Utc>),
}

/// Result type alias for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;
