//! Shared watermark storage.
//!
//! The store is the only authority on watermarks. It is written solely
//! through [`WatermarkStore::compare_and_swap`], which must be atomic on the
//! store side.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{CheckpointError, Result};

/// Storage backend for watermarks.
///
/// Implementations MUST:
/// - run `compare_and_swap` as one indivisible operation
/// - compare watermarks numerically
/// - never decrease or delete a watermark
pub trait WatermarkStore: Send + Sync {
    /// Reads the watermark stored under `key`.
    ///
    /// Returns `None` if no watermark has been admitted yet.
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>>> + Send + 'a>>;

    /// Sets the watermark to `candidate` if it is absent or strictly lower.
    ///
    /// Returns whether the watermark was advanced.
    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        candidate: i64,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// Round trips served by a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// `get` calls
    pub gets: u64,
    /// `compare_and_swap` calls
    pub swaps: u64,
}

/// In-process [`WatermarkStore`].
///
/// A single mutex serializes every swap, which gives the same guarantee a
/// remote store gets from running the swap server-side.
#[derive(Debug, Default)]
pub struct MemoryStore {
    watermarks: Mutex<HashMap<String, i64>>,
    unavailable: AtomicBool,
    gets: AtomicU64,
    swaps: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: every call fails while `unavailable` is set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of calls served so far.
    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            gets: self.gets.load(Ordering::SeqCst),
            swaps: self.swaps.load(Ordering::SeqCst),
        }
    }

    /// Reads a watermark without going through the async interface.
    #[must_use]
    pub fn watermark(&self, key: &str) -> Option<i64> {
        self.watermarks.lock().get(key).copied()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CheckpointError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn swap(&self, key: &str, candidate: i64) -> Result<bool> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let mut watermarks = self.watermarks.lock();
        match watermarks.get_mut(key) {
            Some(current) if *current >= candidate => Ok(false),
            Some(current) => {
                *current = candidate;
                Ok(true)
            }
            None => {
                watermarks.insert(key.to_string(), candidate);
                Ok(true)
            }
        }
    }
}

impl WatermarkStore for MemoryStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>>> + Send + 'a>> {
        Box::pin(async move {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.ensure_available()?;
            Ok(self.watermark(key))
        })
    }

    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        candidate: i64,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move { self.swap(key, candidate) })
    }
}
