//! Cache Entry Module
//!
//! Defines the structure for individual in-process cache entries.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value and the instant it stops being visible.
///
/// Entries are immutable: overwriting a key replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The serialized value
    pub value: Vec<u8>,
    /// When the entry expires
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` from now.
    pub fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration
    /// instant, so a zero TTL is expired immediately.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
