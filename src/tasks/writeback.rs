//! Cache Write-Back Task
//!
//! Detached background task that persists one value to the cache.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::CacheClient;

/// Spawns a task that writes `value` under `key` with the given TTL.
///
/// The caller is not expected to await the handle. The write is attempted
/// once; a failure is logged and counted by the client and has no other
/// effect. Dropping the handle leaves the task running.
///
/// # Arguments
/// * `cache` - Client the write goes through
/// * `key` - Cache key
/// * `value` - Serialized value
/// * `ttl` - Expiry of the written entry
///
/// # Example
/// ```ignore
/// let handle = spawn_cache_write(cache.clone(), key, bytes, Duration::from_secs(300));
/// // Tests may await it; request handlers do not.
/// handle.await?;
/// ```
pub fn spawn_cache_write(
    cache: CacheClient,
    key: String,
    value: Vec<u8>,
    ttl: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bytes = value.len();
        if cache.set(&key, value, ttl).await {
            debug!(key = %key, bytes, ttl_secs = ttl.as_secs(), "cache write-back complete");
        }
    })
}
