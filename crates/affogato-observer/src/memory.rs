//! Scripted in-process log transport.
//!
//! Useful in tests and for replaying captured logs. Each source holds a
//! list of chunks; [`LogTransport::open`] replays the last `tail` of them
//! as they were when the stream was opened, then either ends or stays open
//! forever when following.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use futures::stream;
use parking_lot::RwLock;

use crate::error::{ObserverError, Result, SourceId};
use crate::framing::{Framing, encode_frame};
use crate::transport::{FrameStream, LogTransport, TailOptions};

#[derive(Debug, Default)]
struct ScriptedSource {
    chunks: Vec<Vec<u8>>,
    failure: Option<String>,
}

/// Decrements the open-stream counter when a stream is dropped.
struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory [`LogTransport`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    framing: Framing,
    sources: RwLock<HashMap<SourceId, ScriptedSource>>,
    open_streams: Arc<AtomicUsize>,
}

impl MemoryTransport {
    /// Creates an empty transport with the given framing.
    #[must_use]
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            ..Self::default()
        }
    }

    /// Registers a source with no output yet.
    pub fn add_source(&self, source: &SourceId) {
        self.sources.write().entry(source.clone()).or_default();
    }

    /// Appends one log line, framed to match this transport.
    pub fn push_line(&self, source: &SourceId, line: &[u8]) {
        let chunk = match self.framing {
            Framing::Multiplexed => encode_frame(1, line),
            Framing::Raw => line.to_vec(),
        };
        self.push_chunk(source, chunk);
    }

    /// Appends a raw chunk exactly as given.
    pub fn push_chunk(&self, source: &SourceId, chunk: Vec<u8>) {
        self.sources
            .write()
            .entry(source.clone())
            .or_default()
            .chunks
            .push(chunk);
    }

    /// Makes reads of `source` fail once its chunks are exhausted.
    pub fn fail_after_chunks(&self, source: &SourceId, reason: impl Into<String>) {
        self.sources.write().entry(source.clone()).or_default().failure = Some(reason.into());
    }

    /// Number of streams opened and not yet dropped.
    #[must_use]
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

impl LogTransport for MemoryTransport {
    fn open<'a>(
        &'a self,
        source: &'a SourceId,
        options: &'a TailOptions,
    ) -> Pin<Box<dyn Future<Output = Result<FrameStream>> + Send + 'a>> {
        Box::pin(async move {
            let (chunks, failure) = {
                let sources = self.sources.read();
                let scripted = sources.get(source).ok_or_else(|| ObserverError::Attach {
                    id: source.to_string(),
                    reason: "no such source".to_string(),
                })?;
                let skip = scripted.chunks.len().saturating_sub(options.tail);
                (scripted.chunks[skip..].to_vec(), scripted.failure.clone())
            };

            self.open_streams.fetch_add(1, Ordering::SeqCst);
            let guard = OpenGuard(Arc::clone(&self.open_streams));

            let history = stream::iter(chunks.into_iter().map(Ok));
            let failure = stream::iter(failure.map(|reason| Err(ObserverError::Read(reason))));
            let tail = if options.follow {
                stream::pending::<Result<Vec<u8>>>().boxed()
            } else {
                stream::empty().boxed()
            };

            let frames = history.chain(failure).chain(tail).map(move |item| {
                let _open = &guard;
                item
            });

            Ok(Box::pin(frames) as FrameStream)
        })
    }

    fn framing(&self) -> Framing {
        self.framing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceId {
        SourceId::new("some-redis").expect("valid source id")
    }

    #[tokio::test]
    async fn unknown_source_fails_to_attach() {
        let transport = MemoryTransport::new(Framing::Raw);
        let result = transport.open(&source(), &TailOptions::snapshot(40)).await;
        assert!(matches!(result, Err(ObserverError::Attach { .. })));
        assert_eq!(transport.open_streams(), 0);
    }

    #[tokio::test]
    async fn replays_only_the_tail() {
        let transport = MemoryTransport::new(Framing::Raw);
        let source = source();
        for i in 0..10 {
            transport.push_line(&source, format!("line {i}").as_bytes());
        }

        let frames = transport.open(&source, &TailOptions::snapshot(3)).await;
        assert!(frames.is_ok());
        if let Ok(frames) = frames {
            let chunks: Vec<_> = frames.filter_map(|r| async move { r.ok() }).collect().await;
            assert_eq!(
                chunks,
                vec![b"line 7".to_vec(), b"line 8".to_vec(), b"line 9".to_vec()]
            );
        }
        assert_eq!(transport.open_streams(), 0);
    }

    #[tokio::test]
    async fn failure_follows_history() {
        let transport = MemoryTransport::new(Framing::Multiplexed);
        let source = source();
        transport.push_line(&source, b"first");
        transport.fail_after_chunks(&source, "connection reset");

        let frames = transport.open(&source, &TailOptions::snapshot(40)).await;
        assert!(frames.is_ok());
        if let Ok(mut frames) = frames {
            assert!(matches!(frames.next().await, Some(Ok(_))));
            assert!(matches!(
                frames.next().await,
                Some(Err(ObserverError::Read(_)))
            ));
            assert!(frames.next().await.is_none());
        }
    }

    #[tokio::test]
    async fn open_streams_tracks_drop() {
        let transport = MemoryTransport::new(Framing::Raw);
        let source = source();
        transport.add_source(&source);

        let frames = transport.open(&source, &TailOptions::follow(40)).await;
        assert_eq!(transport.open_streams(), 1);
        drop(frames);
        assert_eq!(transport.open_streams(), 0);
    }
}
