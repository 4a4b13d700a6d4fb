//! Configuration for the affogato binary.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! [observer]
//! tail_lines = 40
//! follow = true
//! line_capacity = 1024
//! # docker_url = "tcp://127.0.0.1:2375"
//!
//! [checkpoint]
//! store = "valkey"
//! valkey_url = "redis://127.0.0.1:6379"
//! key_prefix = "affogato:checkpoint:"
//! cache_ttl_secs = 300
//!
//! [pipeline]
//! # app_name = "cache-primary"
//! skip_parse_errors = true
//! ```

use std::path::Path;

use affogato_checkpoint::{DEFAULT_CACHE_TTL, DEFAULT_KEY_PREFIX, GateConfig};
use affogato_observer::{DEFAULT_LINE_CAPACITY, DEFAULT_TAIL_LINES, ObserverConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Log observer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObserverSection {
    /// History lines replayed on attach.
    pub tail_lines: usize,
    /// Keep following after the history.
    pub follow: bool,
    /// Line channel capacity.
    pub line_capacity: usize,
    /// Docker daemon URL; local defaults when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_url: Option<String>,
}

impl Default for ObserverSection {
    fn default() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
            follow: true,
            line_capacity: DEFAULT_LINE_CAPACITY,
            docker_url: None,
        }
    }
}

impl ObserverSection {
    /// Observer settings derived from this section.
    #[must_use]
    pub const fn observer_config(&self) -> ObserverConfig {
        ObserverConfig {
            tail_lines: self.tail_lines,
            follow: self.follow,
            line_capacity: self.line_capacity,
        }
    }
}

/// Which watermark store to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process store; checkpoints are not shared with other processes.
    Memory,
    /// Shared Valkey/Redis store.
    #[default]
    Valkey,
}

/// Checkpoint gate settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckpointSection {
    /// Store backend.
    pub store: StoreKind,
    /// Store URL, required for [`StoreKind::Valkey`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valkey_url: Option<String>,
    /// Namespace prefix of checkpoint keys.
    pub key_prefix: String,
    /// Seconds a cached watermark is trusted.
    pub cache_ttl_secs: u64,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            valkey_url: Some("redis://127.0.0.1:6379".to_string()),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl CheckpointSection {
    /// Gate settings derived from this section.
    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            key_prefix: self.key_prefix.clone(),
            cache_ttl_secs: self.cache_ttl_secs,
        }
    }
}

/// Composition settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineSection {
    /// Checkpoint name; defaults to the watched source's ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Log and skip lines that fail to parse instead of stopping.
    pub skip_parse_errors: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            app_name: None,
            skip_parse_errors: true,
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AffogatoConfig {
    /// Observer configuration.
    pub observer: ObserverSection,
    /// Checkpoint configuration.
    pub checkpoint: CheckpointSection,
    /// Pipeline configuration.
    pub pipeline: PipelineSection,
}

impl AffogatoConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.observer.line_capacity == 0 {
            return Err(ConfigError::Invalid(
                "observer.line_capacity must be positive".to_string(),
            ));
        }

        if self.checkpoint.key_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "checkpoint.key_prefix cannot be empty".to_string(),
            ));
        }

        if self.checkpoint.store == StoreKind::Valkey
            && self.checkpoint.valkey_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "checkpoint.valkey_url is required for the valkey store".to_string(),
            ));
        }

        if self.pipeline.app_name.as_deref() == Some("") {
            return Err(ConfigError::Invalid(
                "pipeline.app_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
