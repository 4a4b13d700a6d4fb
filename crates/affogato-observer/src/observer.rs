//! Background log watching.
//!
//! [`LogObserver::watch`] spawns one task per source. The task attaches
//! through the transport, strips framing and pushes lines into a bounded
//! channel, awaiting when the consumer lags. A fatal error is delivered at
//! most once on a separate channel of capacity one. Both channels close
//! when the task ends, whether the stream finished, failed or was
//! cancelled.

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::error::{ObserverError, SourceId};
use crate::transport::{LogTransport, TailOptions};

/// History lines requested on attach.
pub const DEFAULT_TAIL_LINES: usize = 40;

/// Capacity of the line channel.
pub const DEFAULT_LINE_CAPACITY: usize = 1024;

/// Observer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// History lines replayed before following.
    pub tail_lines: usize,
    /// Keep following new output after the history.
    pub follow: bool,
    /// Lines buffered before the producer waits on the consumer.
    pub line_capacity: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
            follow: true,
            line_capacity: DEFAULT_LINE_CAPACITY,
        }
    }
}

impl ObserverConfig {
    /// Replay the default history and stop instead of following.
    #[must_use]
    pub fn snapshot() -> Self {
        Self {
            follow: false,
            ..Self::default()
        }
    }

    /// Transport options derived from this config.
    #[must_use]
    pub const fn tail_options(&self) -> TailOptions {
        TailOptions {
            tail: self.tail_lines,
            follow: self.follow,
        }
    }
}

/// Watches log sources through one transport.
#[derive(Clone)]
pub struct LogObserver {
    transport: Arc<dyn LogTransport>,
    config: ObserverConfig,
}

impl LogObserver {
    /// Creates an observer over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn LogTransport>, config: ObserverConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the observer configuration.
    #[must_use]
    pub const fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Starts watching `source`.
    ///
    /// The watch ends when `cancel` (or the returned watch's own handle) is
    /// cancelled, when the source's stream ends, or on the first error.
    /// Must be called from within a tokio runtime.
    pub fn watch(&self, cancel: &CancellationToken, source: SourceId) -> LogWatch {
        let (line_tx, lines) = mpsc::channel(self.config.line_capacity.max(1));
        let (error_tx, errors) = mpsc::channel(1);
        let token = cancel.child_token();

        let producer = Producer {
            transport: Arc::clone(&self.transport),
            source,
            options: self.config.tail_options(),
            lines: line_tx,
            errors: error_tx,
            cancel: token.clone(),
        };
        let task = tokio::spawn(producer.run());

        LogWatch {
            lines,
            errors,
            handle: WatchHandle {
                guard: token.clone().drop_guard(),
                cancel: token,
                task,
            },
        }
    }
}

/// Owns both channel senders; they close when it is dropped.
struct Producer {
    transport: Arc<dyn LogTransport>,
    source: SourceId,
    options: TailOptions,
    lines: mpsc::Sender<Vec<u8>>,
    errors: mpsc::Sender<ObserverError>,
    cancel: CancellationToken,
}

impl Producer {
    async fn run(self) {
        let framing = self.transport.framing();

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(source = %self.source, "watch cancelled before attach");
                return;
            }
            opened = self.transport.open(&self.source, &self.options) => opened,
        };

        let mut frames = match opened {
            Ok(frames) => frames,
            Err(e) => {
                warn!(source = %self.source, error = %e, "failed to attach to log source");
                self.fail(e);
                return;
            }
        };

        info!(
            source = %self.source,
            tail = self.options.tail,
            follow = self.options.follow,
            "watching logs"
        );

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!(source = %self.source, "watch cancelled");
                    break;
                }
                next = frames.next() => next,
            };

            let line = match next.map(|chunk| chunk.and_then(|c| framing.decode(c))) {
                None => {
                    debug!(source = %self.source, "log stream ended");
                    break;
                }
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    warn!(source = %self.source, error = %e, "error reading logs");
                    self.fail(e);
                    break;
                }
            };

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!(source = %self.source, "watch cancelled while delivering");
                    break;
                }
                sent = self.lines.send(line) => {
                    if sent.is_err() {
                        debug!(source = %self.source, "line receiver dropped");
                        break;
                    }
                }
            }
        }

        // Close the transport before the channels so no read is left pending.
        drop(frames);
    }

    fn fail(&self, error: ObserverError) {
        // Capacity is one and only one error is ever sent.
        let _ = self.errors.try_send(error);
    }
}

/// Cancels and awaits one watch.
///
/// Dropping the handle cancels the watch.
pub struct WatchHandle {
    cancel: CancellationToken,
    guard: DropGuard,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Cancels the watch. Safe to call any number of times, at any point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the background task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the background task to exit.
    pub async fn join(self) {
        let Self { guard, task, .. } = self;
        if let Err(e) = task.await {
            warn!(error = %e, "log watch task failed");
        }
        drop(guard);
    }
}

/// A running watch: the line and error channels plus their handle.
pub struct LogWatch {
    lines: mpsc::Receiver<Vec<u8>>,
    errors: mpsc::Receiver<ObserverError>,
    handle: WatchHandle,
}

impl LogWatch {
    /// Receives the next line, or `None` once the line channel is closed.
    pub async fn recv_line(&mut self) -> Option<Vec<u8>> {
        self.lines.recv().await
    }

    /// Receives the fatal error, or `None` if the watch ended without one.
    ///
    /// Waits until the watch has ended.
    pub async fn recv_error(&mut self) -> Option<ObserverError> {
        self.errors.recv().await
    }

    /// Cancels the watch.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Returns the handle controlling this watch.
    #[must_use]
    pub const fn handle(&self) -> &WatchHandle {
        &self.handle
    }

    /// Splits into the raw channel receivers and the handle.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<Vec<u8>>,
        mpsc::Receiver<ObserverError>,
        WatchHandle,
    ) {
        (self.lines, self.errors, self.handle)
    }
}
