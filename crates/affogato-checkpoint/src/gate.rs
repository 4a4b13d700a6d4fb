//! The checkpoint gate.
//!
//! A check reads a lower bound on the watermark from the local cache
//! (fetching it from the store on a miss). A candidate below the bound is
//! rejected locally. Anything else goes to the store's compare-and-swap,
//! which alone decides admission. The cache is not updated after a swap;
//! it expires on its own, which can only cause conservative rejects.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{DEFAULT_CACHE_TTL, LowerBound, WatermarkCache};
use crate::error::{CheckpointError, Result};
use crate::keys::{DEFAULT_KEY_PREFIX, KeyRegistry};
use crate::store::WatermarkStore;

/// Gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Namespace prefix of checkpoint keys.
    pub key_prefix: String,
    /// Seconds a cached watermark is trusted.
    pub cache_ttl_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl GateConfig {
    /// Cache time-to-live.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Admission decision for log records, per application.
pub trait Checkpoint: Send + Sync {
    /// Returns true if `timestamp` is newer than anything admitted before
    /// for `app_name`, in which case it becomes the new watermark.
    fn check<'a>(
        &'a self,
        app_name: &'a str,
        timestamp: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// Cache-accelerated monotonic checkpoint over a shared store.
pub struct CheckpointGate {
    store: Arc<dyn WatermarkStore>,
    cache: WatermarkCache,
    keys: KeyRegistry,
}

impl CheckpointGate {
    /// Creates a gate over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn WatermarkStore>, config: GateConfig) -> Self {
        Self {
            store,
            cache: WatermarkCache::new(config.cache_ttl()),
            keys: KeyRegistry::new(config.key_prefix),
        }
    }

    /// Returns the local watermark cache.
    #[must_use]
    pub const fn cache(&self) -> &WatermarkCache {
        &self.cache
    }

    /// Returns the store key used for `app_name`.
    pub fn key(&self, app_name: &str) -> Arc<str> {
        self.keys.key(app_name)
    }

    /// Checks `timestamp` for `app_name`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::TimestampOutOfRange`] if the timestamp
    /// does not fit in `i64` nanoseconds, or a store error.
    pub async fn check(&self, app_name: &str, timestamp: DateTime<Utc>) -> Result<bool> {
        let candidate = timestamp
            .timestamp_nanos_opt()
            .ok_or(CheckpointError::TimestampOutOfRange(timestamp))?;
        self.check_nanos(app_name, candidate).await
    }

    /// Checks a candidate given in epoch nanoseconds.
    pub async fn check_nanos(&self, app_name: &str, candidate: i64) -> Result<bool> {
        let key = self.keys.key(app_name);

        let bound = self.lower_bound(&key).await?;
        if bound.rejects(candidate) {
            debug!(app = %app_name, candidate, ?bound, "rejected by cached watermark");
            return Ok(false);
        }

        let admitted = self
            .store
            .compare_and_swap(&key, candidate)
            .await
            .inspect_err(|e| warn!(app = %app_name, error = %e, "checkpoint swap failed"))?;

        debug!(app = %app_name, candidate, admitted, "checkpoint swap");
        Ok(admitted)
    }

    /// Read-through lookup of the cached lower bound.
    async fn lower_bound(&self, key: &Arc<str>) -> Result<LowerBound> {
        if let Some(bound) = self.cache.get(key) {
            return Ok(bound);
        }

        let current = self
            .store
            .get(key)
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "checkpoint read failed"))?;

        let bound = LowerBound::from(current);
        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!(purged, "dropped expired checkpoint cache entries");
        }
        self.cache.insert(Arc::clone(key), bound);
        Ok(bound)
    }
}

impl Checkpoint for CheckpointGate {
    fn check<'a>(
        &'a self,
        app_name: &'a str,
        timestamp: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(Self::check(self, app_name, timestamp))
    }
}
