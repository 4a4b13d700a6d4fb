//! Local read-through cache of watermarks.
//!
//! Entries are copies of the store's watermark taken at some earlier
//! instant. The watermark never decreases, so an entry is always a lower
//! bound on the current value and can only be used to reject.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

/// How long a cached watermark is trusted.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Lower bound on a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerBound {
    /// No watermark existed when read.
    Unset,
    /// The watermark was at least this value.
    At(i64),
}

impl LowerBound {
    /// Returns true if `candidate` is certainly not newer than the watermark.
    #[must_use]
    pub const fn rejects(self, candidate: i64) -> bool {
        match self {
            Self::Unset => false,
            Self::At(watermark) => candidate < watermark,
        }
    }
}

impl From<Option<i64>> for LowerBound {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Unset, Self::At)
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    bound: LowerBound,
    expires_at: Instant,
}

/// TTL cache of watermark lower bounds, keyed by checkpoint key.
#[derive(Debug)]
pub struct WatermarkCache {
    ttl: Duration,
    entries: RwLock<HashMap<Arc<str>, CacheEntry>>,
}

impl Default for WatermarkCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl WatermarkCache {
    /// Creates a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the entry's time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached bound for `key` unless missing or expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<LowerBound> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        (Instant::now() < entry.expires_at).then_some(entry.bound)
    }

    /// Caches `bound` for `key` for one TTL.
    pub fn insert(&self, key: Arc<str>, bound: LowerBound) {
        let entry = CacheEntry {
            bound,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().insert(key, entry);
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    /// Number of entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LowerBound::Unset, i64::MIN, false ; "unset never rejects")]
    #[test_case(LowerBound::At(100), 99, true ; "older rejected")]
    #[test_case(LowerBound::At(100), 100, false ; "equal goes to store")]
    #[test_case(LowerBound::At(100), 101, false ; "newer goes to store")]
    #[test_case(LowerBound::At(-5), -6, true ; "negative")]
    fn lower_bound_rejects(bound: LowerBound, candidate: i64, expected: bool) {
        assert_eq!(bound.rejects(candidate), expected);
    }

    #[test]
    fn lower_bound_from_option() {
        assert_eq!(LowerBound::from(None), LowerBound::Unset);
        assert_eq!(LowerBound::from(Some(7)), LowerBound::At(7));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = WatermarkCache::new(Duration::from_secs(300));
        cache.insert(Arc::from("k"), LowerBound::At(42));
        assert_eq!(cache.get("k"), Some(LowerBound::At(42)));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("k"), Some(LowerBound::At(42)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn insert_refreshes_expiry() {
        let cache = WatermarkCache::new(Duration::from_secs(10));
        cache.insert(Arc::from("k"), LowerBound::Unset);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert(Arc::from("k"), LowerBound::At(1));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k"), Some(LowerBound::At(1)));
    }

    #[test]
    fn missing_key_is_a_miss() {
        let cache = WatermarkCache::default();
        assert_eq!(cache.ttl(), Duration::from_secs(300));
        assert_eq!(cache.get("absent"), None);
    }
}
