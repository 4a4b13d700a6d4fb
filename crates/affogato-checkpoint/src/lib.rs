//! # affogato-checkpoint
//!
//! Per-application monotonic checkpoints shared by every collector that
//! reads the same logs.
//!
//! This crate provides:
//!
//! - [`CheckpointGate`]: Admit/reject decision against a shared watermark
//! - [`Checkpoint`]: Object-safe trait over gates
//! - [`WatermarkStore`]: Shared store with an atomic compare-and-swap
//! - [`MemoryStore`]: In-process store
//! - `ValkeyStore`: Valkey/Redis store (feature `valkey`)
//! - [`WatermarkCache`]: Local TTL cache of watermark lower bounds
//! - [`KeyRegistry`]: Interned checkpoint keys
//!
//! A gate admits a timestamp only if it is strictly newer than every
//! timestamp admitted before for the same application, across all gates
//! sharing the store.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use affogato_checkpoint::{CheckpointGate, GateConfig, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = CheckpointGate::new(Arc::new(MemoryStore::new()), GateConfig::default());
//!
//! assert_eq!(gate.check_nanos("valkey", 10).await.ok(), Some(true));
//! assert_eq!(gate.check_nanos("valkey", 10).await.ok(), Some(false));
//! assert_eq!(gate.check_nanos("valkey", 11).await.ok(), Some(true));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod gate;
pub mod keys;
pub mod store;
#[cfg(feature = "valkey")]
pub mod valkey;

pub use cache::{DEFAULT_CACHE_TTL, LowerBound, WatermarkCache};
pub use error::{CheckpointError, Result};
pub use gate::{Checkpoint, CheckpointGate, GateConfig};
pub use keys::{DEFAULT_KEY_PREFIX, KeyRegistry};
pub use store::{MemoryStore, StoreCalls, WatermarkStore};
#[cfg(feature = "valkey")]
pub use valkey::ValkeyStore;
