//! # affogato-observer
//!
//! Tails one container's log output as a stream of raw lines.
//!
//! This crate provides:
//!
//! - [`LogTransport`]: Source of framed log chunks (Docker, in-memory, ...)
//! - [`Framing`]: Removal of the per-chunk frame header
//! - [`LogObserver`]: Spawns one background task per watched source
//! - [`LogWatch`]: Bounded line channel plus a one-shot error channel
//! - [`MemoryTransport`]: Scripted in-process transport
//! - `DockerTransport`: bollard-backed transport (feature `docker`)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use affogato_observer::{Framing, LogObserver, MemoryTransport, ObserverConfig, SourceId};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let source = SourceId::new("some-redis").unwrap();
//! let transport = MemoryTransport::new(Framing::Multiplexed);
//! transport.push_line(&source, b"1:M 31 Dec 2024 19:04:28.665 * Server initialized");
//!
//! let observer = LogObserver::new(Arc::new(transport), ObserverConfig::snapshot());
//! let mut watch = observer.watch(&CancellationToken::new(), source);
//!
//! while let Some(line) = watch.recv_line().await {
//!     println!("{}", String::from_utf8_lossy(&line));
//! }
//! assert!(watch.recv_error().await.is_none());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "docker")]
pub mod docker;
pub mod error;
pub mod framing;
pub mod memory;
pub mod observer;
pub mod transport;

#[cfg(feature = "docker")]
pub use docker::DockerTransport;
pub use error::{ObserverError, Result, SourceId};
pub use framing::{FRAME_HEADER_LEN, Framing, encode_frame};
pub use memory::MemoryTransport;
pub use observer::{
    DEFAULT_LINE_CAPACITY, DEFAULT_TAIL_LINES, LogObserver, LogWatch, ObserverConfig, WatchHandle,
};
pub use transport::{FrameStream, LogTransport, TailOptions};
