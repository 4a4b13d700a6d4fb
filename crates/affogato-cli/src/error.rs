//! Error types for the affogato binary's library half.

use std::path::PathBuf;

use affogato_checkpoint::CheckpointError;
use affogato_observer::ObserverError;
use affogato_parser::ParseError;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("failed to access config file '{path}': {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that stop a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The watch failed.
    #[error(transparent)]
    Observer(#[from] ObserverError),

    /// A line failed to parse and parse errors are not skipped.
    #[error("failed to parse {line:?}: {source}")]
    Parse {
        /// The offending line, lossily decoded.
        line: String,
        /// Why it failed.
        source: ParseError,
    },

    /// The checkpoint store failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The sink refused a record.
    #[error("failed to emit record: {0}")]
    Sink(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ConfigError::Invalid("line_capacity must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: line_capacity must be positive"
        );

        let err = PipelineError::Parse {
            line: "abc:M".to_string(),
            source: ParseError::InvalidPid("abc".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse \"abc:M\": invalid PID: \"abc\""
        );

        let err = PipelineError::from(CheckpointError::Unavailable("down".to_string()));
        assert_eq!(err.to_string(), "checkpoint store unavailable: down");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfigError>();
        assert_send_sync::<PipelineError>();
    }
}
