//! Cache Module
//!
//! Cache-aside memoization over Redis-compatible backends.

mod backend;
mod client;
mod entry;
mod key;
mod memoize;
mod memory;
mod redis_backend;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::CacheBackend;
pub use client::{CacheClient, DEFAULT_OP_TIMEOUT, MEMORY_URL};
pub use entry::CacheEntry;
pub use key::{derive_key, CallArgs, KEY_HASH_WIDTH};
pub use memoize::{Envelope, Memoized, Memoizer, Source};
pub use memory::{MemoryBackend, DEFAULT_MAX_ENTRIES};
pub use redis_backend::{normalize_url, RedisBackend};
pub use stats::CacheStats;

// == Public Constants ==
/// TTL used when a call site does not pick one
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(300);
