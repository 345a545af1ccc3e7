//! Pool Statistics Module
//!
//! Point-in-time view of pool occupancy and lifetime counters.

use serde::Serialize;

// == Pool Stats ==
/// Snapshot of a pool's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Fixed number of resources the pool was built with
    pub size: usize,
    /// Resources currently waiting in the pool
    pub available: usize,
    /// Resources currently checked out
    pub in_use: usize,
    /// Successful acquisitions since startup
    pub acquired: u64,
    /// Releases since startup
    pub released: u64,
    /// Acquisitions that timed out
    pub exhausted: u64,
    /// Whether the pool has been shut down
    pub closed: bool,
}

impl PoolStats {
    /// Fraction of the pool currently checked out, 0.0 for an empty pool.
    pub fn utilization(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.in_use as f64 / self.size as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_empty_pool() {
        assert_eq!(PoolStats::default().utilization(), 0.0);
    }

    #[test]
    fn test_utilization_half_used() {
        let stats = PoolStats {
            size: 4,
            available: 2,
            in_use: 2,
            ..Default::default()
        };
        assert_eq!(stats.utilization(), 0.5);
    }
}
