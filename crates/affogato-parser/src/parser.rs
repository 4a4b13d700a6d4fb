//! Single-pass decoder for server log lines.
//!
//! Lines have the shape
//! `<pid>:<role> <DD Mon YYYY HH:MM:SS.mmm> <severity> <message>`, for example
//! `19538:M 31 Dec 2024 19:04:28.665 * Ready to accept connections tcp`.

use chrono::NaiveDateTime;

use crate::error::{ParseError, Result};
use crate::types::{LogRecord, Role, Severity};

/// `chrono` format of the timestamp field.
pub const TIME_FORMAT: &str = "%d %b %Y %H:%M:%S%.3f";

/// Position of the scanner within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Reading the PID, up to `:`.
    Pid,
    /// Reading the role character, up to a space.
    Role,
    /// Reading the timestamp, up to the severity marker.
    Time,
    /// Everything left is the message.
    Message,
}

/// Stateless decoder for server log lines.
///
/// Safe to share across threads; every call works only on its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser;

impl LineParser {
    /// Creates a new line parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses a line given as text.
    pub fn parse_str(&self, line: &str) -> Result<LogRecord> {
        self.parse(line.as_bytes())
    }

    /// Parses one raw log line.
    ///
    /// Either a complete record or an error is returned, never a partial
    /// record. Line terminators are not stripped.
    pub fn parse(&self, line: &[u8]) -> Result<LogRecord> {
        let mut step = Step::Pid;
        let mut start = 0;

        let mut pid = 0;
        let mut role = Role::Child;
        let mut severity = Severity::Info;
        let mut time = NaiveDateTime::default();

        for (i, &b) in line.iter().enumerate() {
            match step {
                Step::Pid => {
                    if b == b':' {
                        pid = parse_pid(&line[start..i])?;
                        step = Step::Role;
                        start = i + 1;
                    }
                }
                Step::Role => {
                    if b == b' ' {
                        let field = &line[start..i];
                        role = match field {
                            [c] => Role::from_byte(*c),
                            _ => None,
                        }
                        .ok_or_else(|| {
                            ParseError::UnknownRole(field.first().map_or(' ', |c| char::from(*c)))
                        })?;
                        step = Step::Time;
                        start = i + 1;
                    }
                }
                Step::Time => {
                    if let Some(marker) = Severity::from_byte(b) {
                        time = parse_time(line, start, i)?;
                        severity = marker;
                        step = Step::Message;
                        // marker plus its trailing space
                        start = i + 2;
                        break;
                    }
                }
                Step::Message => break,
            }
        }

        if step != Step::Message || start >= line.len() {
            return Err(ParseError::NoMessage);
        }

        Ok(LogRecord {
            pid,
            role,
            severity,
            time,
            message: String::from_utf8_lossy(&line[start..]).into_owned(),
        })
    }
}

fn parse_pid(field: &[u8]) -> Result<u32> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| ParseError::InvalidPid(String::from_utf8_lossy(field).into_owned()))
}

/// Parses the timestamp between `start` and the severity marker at `marker`.
///
/// Exactly one space must separate the timestamp from the marker.
fn parse_time(line: &[u8], start: usize, marker: usize) -> Result<NaiveDateTime> {
    let invalid = || {
        ParseError::InvalidTimestamp(String::from_utf8_lossy(&line[start..marker]).into_owned())
    };

    if marker <= start || line[marker - 1] != b' ' {
        return Err(invalid());
    }

    let text = std::str::from_utf8(&line[start..marker - 1]).map_err(|_| invalid())?;
    NaiveDateTime::parse_from_str(text, TIME_FORMAT).map_err(|_| invalid())
}
