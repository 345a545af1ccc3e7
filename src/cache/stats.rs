//! Cache Statistics Module
//!
//! Tracks lookups, absorbed backend failures and background writes.

use serde::Serialize;

// == Cache Stats ==
/// Counters kept by the cache client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to computation, failures included
    pub misses: u64,
    /// Backend failures absorbed (connection errors, timeouts, bad payloads)
    pub errors: u64,
    /// Values written to the backend
    pub writes: u64,
    /// Writes that failed and were dropped
    pub write_failures: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    // == Record Write ==
    /// Counts a finished write, successful or not.
    pub fn record_write(&mut self, succeeded: bool) {
        if succeeded {
            self.writes += 1;
        } else {
            self.write_failures += 1;
        }
    }
}
