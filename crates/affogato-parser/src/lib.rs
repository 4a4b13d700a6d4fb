//! # affogato-parser
//!
//! Decoder for the log lines written by Redis and Valkey servers.
//!
//! This crate provides:
//!
//! - [`LogRecord`]: One decoded server log line
//! - [`Role`]: Process role that wrote the line (child, master, replica, AOF)
//! - [`Severity`]: Severity marker (`*` info, `#` warning)
//! - [`LineParser`]: Stateless single-pass decoder
//! - [`ParseError`]: Why a line could not be decoded
//!
//! ## Example
//!
//! ```rust
//! use affogato_parser::{LineParser, Role, Severity};
//!
//! let record = LineParser::new()
//!     .parse(b"19538:M 31 Dec 2024 19:04:28.665 * Ready to accept connections tcp")
//!     .unwrap();
//!
//! assert_eq!(record.pid, 19538);
//! assert_eq!(record.role, Role::Master);
//! assert_eq!(record.severity, Severity::Info);
//! assert_eq!(record.message, "Ready to accept connections tcp");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod parser;
pub mod types;

pub use error::{ParseError, Result};
pub use parser::{LineParser, TIME_FORMAT};
pub use types::{LogRecord, Role, Severity};
