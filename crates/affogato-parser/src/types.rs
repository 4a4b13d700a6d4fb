//! Decoded log record types.
//!
//! This module provides:
//! - [`Role`]: Which server process wrote the line
//! - [`Severity`]: Info or warning marker
//! - [`LogRecord`]: One fully decoded line

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of the server process that wrote a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Forked child (`C`), e.g. an RDB save.
    Child,
    /// Primary server process (`M`).
    Master,
    /// Replica (`S`).
    Replica,
    /// Append-only file rewrite child (`A`).
    AppendOnly,
}

impl Role {
    /// Maps a role character to a role.
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'C' => Some(Self::Child),
            b'M' => Some(Self::Master),
            b'S' => Some(Self::Replica),
            b'A' => Some(Self::AppendOnly),
            _ => None,
        }
    }

    /// Returns the character used for this role in log lines.
    #[must_use]
    pub const fn as_char(&self) -> char {
        match self {
            Self::Child => 'C',
            Self::Master => 'M',
            Self::Replica => 'S',
            Self::AppendOnly => 'A',
        }
    }

    /// Returns the lowercase name of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Master => "master",
            Self::Replica => "replica",
            Self::AppendOnly => "appendonly",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity marker of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational (`*`)
    Info,
    /// Warning (`#`)
    Warn,
}

impl Severity {
    /// Maps a severity marker to a severity.
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'*' => Some(Self::Info),
            b'#' => Some(Self::Warn),
            _ => None,
        }
    }

    /// Returns the marker character for this severity.
    #[must_use]
    pub const fn as_char(&self) -> char {
        match self {
            Self::Info => '*',
            Self::Warn => '#',
        }
    }

    /// Returns the string representation of this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded server log line.
///
/// Records are immutable once parsed and carry no identity beyond their
/// contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Process id of the writer
    pub pid: u32,
    /// Role of the writer
    pub role: Role,
    /// Severity marker
    pub severity: Severity,
    /// Wall-clock time of the source, millisecond precision, no zone
    pub time: NaiveDateTime,
    /// Message text, verbatim
    pub message: String,
}

impl LogRecord {
    /// Interprets the record's naive time as UTC.
    ///
    /// This is the timestamp fed to the checkpoint gate.
    #[must_use]
    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        self.time.and_utc()
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {} {}",
            self.pid,
            self.role.as_char(),
            self.time.format(crate::parser::TIME_FORMAT),
            self.severity.as_char(),
            self.message
        )
    }
}
