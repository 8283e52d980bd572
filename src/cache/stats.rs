//! Cache Statistics Module
//!
//! Tracks tier hits, fetch activity and durable-store recoveries.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the hot cache
    pub memory_hits: u64,
    /// Lookups answered from the durable store
    pub durable_hits: u64,
    /// Lookups that had to wait for the origin
    pub misses: u64,
    /// Strategy fetch invocations
    pub fetches: u64,
    /// Callers attached to a fetch already in flight
    pub joined: u64,
    /// Background revalidations started
    pub revalidations: u64,
    /// Fetches that ended in an error
    pub fetch_errors: u64,
    /// Prefix clears triggered by a full or unverified durable write
    pub quota_clears: u64,
    /// Durable writes given up on after the retry
    pub dropped_writes: u64,
    /// Current number of entries in the hot cache
    pub hot_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Fraction of lookups answered without waiting on the origin.
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.durable_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_join(&mut self) {
        self.joined += 1;
    }

    pub fn record_revalidation(&mut self) {
        self.revalidations += 1;
    }

    pub fn record_fetch_error(&mut self) {
        self.fetch_errors += 1;
    }

    pub fn record_quota_clear(&mut self) {
        self.quota_clears += 1;
    }

    pub fn record_dropped_write(&mut self) {
        self.dropped_writes += 1;
    }

    // == Update Entry Count ==
    /// Updates the hot cache entry count.
    pub fn set_hot_entries(&mut self, count: usize) {
        self.hot_entries = count;
    }
}
