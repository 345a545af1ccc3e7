//! Cache Backend Module
//!
//! The key-value contract the cache client talks to.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

// == Cache Backend ==
/// A Redis-compatible key-value store with per-key expiry.
///
/// Values are opaque bytes. Expiry is enforced by the backend; the client
/// never sweeps entries itself.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    /// Checks that the backend answers.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Returns the value stored under `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key`, expiring after `ttl`.
    async fn setex(&self, key: &str, ttl: Duration, value: Vec<u8>) -> Result<(), CacheError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Releases backend connections.
    async fn close(&self) {}
}
