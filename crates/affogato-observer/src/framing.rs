//! Frame header removal.
//!
//! Multiplexed container log streams prefix every chunk with an 8-byte
//! header: one stream-type byte, three zero bytes, then the payload length
//! as a big-endian `u32`. The header is out of band; only the payload is a
//! log line. One frame carries exactly one line, fragments are not
//! reassembled.

use crate::error::{ObserverError, Result};

/// Size of the multiplexed frame header.
pub const FRAME_HEADER_LEN: usize = 8;

/// How a transport frames the lines it delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Each chunk starts with a [`FRAME_HEADER_LEN`]-byte header.
    #[default]
    Multiplexed,
    /// Chunks are bare lines, already demultiplexed.
    Raw,
}

impl Framing {
    /// Turns one transport chunk into one log line.
    ///
    /// Strips the frame header (for [`Framing::Multiplexed`]) and a trailing
    /// `\n` or `\r\n`.
    pub fn decode(self, mut chunk: Vec<u8>) -> Result<Vec<u8>> {
        if self == Self::Multiplexed {
            if chunk.len() < FRAME_HEADER_LEN {
                return Err(ObserverError::MalformedFrame { len: chunk.len() });
            }
            chunk.drain(..FRAME_HEADER_LEN);
        }

        if chunk.last() == Some(&b'\n') {
            chunk.pop();
            if chunk.last() == Some(&b'\r') {
                chunk.pop();
            }
        }

        Ok(chunk)
    }
}

/// Builds a multiplexed frame around `payload`.
///
/// `stream` is the stream-type byte (1 = stdout, 2 = stderr).
#[must_use]
pub fn encode_frame(stream: u8, payload: &[u8]) -> Vec<u8> {
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&[stream, 0, 0, 0]);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}
