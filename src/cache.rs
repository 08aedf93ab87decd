//! Last-known-good cache of resolved metrics.
//!
//! Written on every successful live resolution, read only after every
//! live source has failed. There is no eviction task: staleness is judged
//! lazily by the reader against the entry's own TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::model::MetricResult;
use crate::observability::metrics;

/// A stored result and when it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub metric_key: String,
    pub result: MetricResult,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// True while `now - stored_at < ttl`.
    ///
    /// An entry stamped in the future (clock moved backwards) counts as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or_default()
    }
}

/// Process-wide cache shared by every metric resolver.
///
/// Concurrent `put`s for the same key race; whichever lands last wins.
#[derive(Clone)]
pub struct StalenessBoundedCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl StalenessBoundedCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Return the entry for `metric_key`, fresh or not.
    pub fn get(&self, metric_key: &str) -> Option<CacheEntry> {
        self.inner.get(metric_key).map(|r| r.value().clone())
    }

    /// Store `result`, replacing any prior entry for the key.
    pub fn put(&self, metric_key: &str, result: MetricResult, ttl: Duration) {
        let entry = CacheEntry {
            metric_key: metric_key.to_string(),
            result,
            stored_at: self.clock.now(),
            ttl,
        };
        self.inner.insert(metric_key.to_string(), entry);
        metrics::record_cache_write(metric_key);
        metrics::record_cache_size(self.inner.len());
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Count of (fresh, stale) entries right now.
    pub fn summary(&self) -> (usize, usize) {
        let now = self.clock.now();
        let mut fresh = 0;
        let mut stale = 0;
        for r in self.inner.iter() {
            if r.value().is_fresh(now) {
                fresh += 1;
            } else {
                stale += 1;
            }
        }
        (fresh, stale)
    }
}

impl std::fmt::Debug for StalenessBoundedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StalenessBoundedCache")
            .field("entries", &self.inner.len())
            .finish()
    }
}
