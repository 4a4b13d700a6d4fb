//! Observer error types and the source identifier.

use std::fmt;

use thiserror::Error;

use crate::framing::FRAME_HEADER_LEN;

/// Errors that end a log watch.
///
/// At most one of these is delivered per watch; it is always fatal for
/// that watch.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Could not connect to the log transport.
    #[error("failed to connect to log transport: {0}")]
    ConnectionFailed(String),

    /// Could not attach to the source's log stream.
    #[error("failed to attach to {id}: {reason}")]
    Attach {
        /// Source ID.
        id: String,
        /// Failure reason.
        reason: String,
    },

    /// Reading from an attached stream failed.
    #[error("failed to read logs: {0}")]
    Read(String),

    /// A chunk was too short to carry a frame header.
    #[error("malformed frame: {len} bytes is shorter than the {FRAME_HEADER_LEN}-byte header")]
    MalformedFrame {
        /// Length of the offending chunk.
        len: usize,
    },

    /// Source identifier rejected.
    #[error("invalid source id: {0}")]
    InvalidSource(String),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;

/// Identifier of one watched log source, e.g. a container ID or name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source ID.
    ///
    /// # Errors
    ///
    /// Returns error if the ID is empty or contains characters that are not
    /// valid in a container ID or name.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ObserverError::InvalidSource(
                "source ID cannot be empty".to_string(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(ObserverError::InvalidSource(format!(
                "invalid source ID: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SourceId {
    type Err = ObserverError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
