//! # affogato-cli
//!
//! Composition of the observer, parser and checkpoint gate, plus the
//! configuration for the `affogato` binary.
//!
//! - [`config`]: TOML configuration
//! - [`pipeline`]: observer → parser → gate → sink

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{AffogatoConfig, CheckpointSection, ObserverSection, PipelineSection, StoreKind};
pub use error::{ConfigError, PipelineError};
pub use pipeline::{Pipeline, PipelineStats};
