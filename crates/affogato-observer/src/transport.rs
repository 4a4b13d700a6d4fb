//! Log transport trait definition.

use std::future::Future;
use std::pin::Pin;

use futures::Stream;

use crate::error::{Result, SourceId};
use crate::framing::Framing;

/// Stream of raw chunks from one attached source.
///
/// Dropping the stream closes the underlying transport handle, which also
/// unblocks any read pending on it.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// What to request when attaching to a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailOptions {
    /// Number of history lines to replay before following.
    pub tail: usize,

    /// Keep the stream open for new output.
    pub follow: bool,
}

impl TailOptions {
    /// Last `tail` lines, then follow.
    #[must_use]
    pub const fn follow(tail: usize) -> Self {
        Self { tail, follow: true }
    }

    /// Last `tail` lines, then end.
    #[must_use]
    pub const fn snapshot(tail: usize) -> Self {
        Self {
            tail,
            follow: false,
        }
    }
}

/// A source of framed log chunks.
///
/// This trait abstracts over container runtimes and test doubles.
pub trait LogTransport: Send + Sync {
    /// Attach to a source's log output.
    ///
    /// # Errors
    ///
    /// Returns error if the source does not exist or the transport cannot
    /// be reached.
    fn open<'a>(
        &'a self,
        source: &'a SourceId,
        options: &'a TailOptions,
    ) -> Pin<Box<dyn Future<Output = Result<FrameStream>> + Send + 'a>>;

    /// How chunks from this transport are framed.
    fn framing(&self) -> Framing {
        Framing::Multiplexed
    }
}
