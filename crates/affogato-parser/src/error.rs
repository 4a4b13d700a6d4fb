//! Error types for line decoding.

use thiserror::Error;

/// Reasons a log line could not be decoded.
///
/// Parse errors are per line and never fatal to the stream the line came
/// from; the caller decides whether to skip, log or abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text before the first `:` is not a process id.
    #[error("invalid PID: {0:?}")]
    InvalidPid(String),

    /// The role character is not one of `C`, `M`, `S`, `A`.
    #[error("unknown role: {0:?}")]
    UnknownRole(char),

    /// The timestamp does not match `DD Mon YYYY HH:MM:SS.mmm`.
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The line ended before a message was found.
    #[error("no message found")]
    NoMessage,
}

/// Result type alias for parse operations.
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ParseError::InvalidPid("abc".to_string());
        assert_eq!(err.to_string(), "invalid PID: \"abc\"");

        let err = ParseError::UnknownRole('X');
        assert_eq!(err.to_string(), "unknown role: 'X'");

        let err = ParseError::InvalidTimestamp("31 Foo 2024".to_string());
        assert_eq!(err.to_string(), "invalid timestamp: \"31 Foo 2024\"");

        let err = ParseError::NoMessage;
        assert_eq!(err.to_string(), "no message found");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ParseError>();
    }
}
