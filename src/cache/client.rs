//! Cache Client Module
//!
//! Best-effort access to a cache backend: failures are logged and read as
//! misses, never returned to the caller.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheBackend, CacheStats, MemoryBackend, RedisBackend};
use crate::error::CacheError;
use crate::tasks::spawn_cache_write;

/// Default network timeout for one cache operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// URL that selects the in-process backend.
pub const MEMORY_URL: &str = "memory://";

// == Cache Client ==
/// Shared handle to an optional cache backend.
///
/// A client without a backend behaves as a cache that always misses. Clones
/// share the backend and the statistics.
#[derive(Clone)]
pub struct CacheClient {
    backend: Option<Arc<dyn CacheBackend>>,
    op_timeout: Duration,
    stats: Arc<Mutex<CacheStats>>,
}

impl fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.backend_name())
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl CacheClient {
    // == Constructors ==
    pub fn new(backend: Arc<dyn CacheBackend>, op_timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            op_timeout,
            stats: Arc::new(Mutex::new(CacheStats::new())),
        }
    }

    /// A client with no backend: every lookup misses, every write is skipped.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            op_timeout: DEFAULT_OP_TIMEOUT,
            stats: Arc::new(Mutex::new(CacheStats::new())),
        }
    }

    /// Connects to the backend named by `url` and checks it with a ping.
    ///
    /// [`MEMORY_URL`] selects an in-process backend; anything else is treated
    /// as a Redis/Valkey URL. If the backend cannot be reached within
    /// `op_timeout` the client starts disabled instead of failing.
    pub async fn connect(url: &str, op_timeout: Duration) -> Self {
        if url == MEMORY_URL {
            info!("using in-process cache backend");
            return Self::new(Arc::new(MemoryBackend::new()), op_timeout);
        }

        let connected = tokio::time::timeout(op_timeout, async {
            let backend = RedisBackend::connect(url).await?;
            backend.ping().await?;
            Ok::<_, CacheError>(backend)
        })
        .await
        .unwrap_or_else(|_| Err(CacheError::Timeout(op_timeout)));

        match connected {
            Ok(backend) => Self::new(Arc::new(backend), op_timeout),
            Err(err) => {
                warn!(error = %err, "cache connection failed, cache will be disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|backend| backend.name())
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Returns a copy of the current counters.
    pub fn stats(&self) -> CacheStats {
        self.lock_stats().clone()
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one backend call under the operation timeout.
    async fn run<T, Fut>(&self, fut: Fut) -> Result<T, CacheError>
    where
        Fut: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .unwrap_or_else(|_| Err(CacheError::Timeout(self.op_timeout)))
    }

    /// Raw lookup without touching hit/miss counters.
    async fn fetch(&self, key: &str) -> Option<Vec<u8>> {
        let backend = self.backend.as_ref()?;
        match self.run(backend.get(key)).await {
            Ok(value) => value,
            Err(err) => {
                self.lock_stats().record_error();
                warn!(key, backend = backend.name(), error = %err, "cache get failed");
                None
            }
        }
    }

    // == Get ==
    /// Returns the bytes stored under `key`.
    ///
    /// A missing backend, a backend error or a timeout all read as `None`.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self.fetch(key).await;
        let mut stats = self.lock_stats();
        if value.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        value
    }

    /// Returns the JSON value stored under `key`.
    ///
    /// A stored value that does not decode as `T` is logged and read as a
    /// miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let decoded = match self.fetch(key).await {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key, error = %err, "cached value could not be decoded");
                    self.lock_stats().record_error();
                    None
                }
            },
            None => None,
        };

        let mut stats = self.lock_stats();
        if decoded.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        decoded
    }

    // == Set ==
    /// Writes `value` under `key` and waits for the backend.
    ///
    /// Returns whether the write succeeded; failures are logged only.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let result = self.run(backend.setex(key, ttl, value)).await;
        let succeeded = result.is_ok();
        if let Err(err) = result {
            warn!(
                key,
                ttl_secs = ttl.as_secs(),
                backend = backend.name(),
                error = %err,
                "cache set failed"
            );
        }
        self.lock_stats().record_write(succeeded);
        succeeded
    }

    /// Serializes `value` as JSON and writes it, see [`set`](Self::set).
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(err) => {
                warn!(key, error = %err, "value could not be serialized for caching");
                false
            }
        }
    }

    // == Detached Set ==
    /// Schedules a write on a background task and returns immediately.
    ///
    /// The write is attempted once; its failure is logged by the task and
    /// never reported back. Returns None when the cache is disabled.
    pub fn set_detached(&self, key: String, value: Vec<u8>, ttl: Duration) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        Some(spawn_cache_write(self.clone(), key, value, ttl))
    }

    // == Delete ==
    /// Removes `key`. Returns whether the backend confirmed the delete.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        match self.run(backend.delete(key)).await {
            Ok(()) => true,
            Err(err) => {
                self.lock_stats().record_error();
                warn!(key, backend = backend.name(), error = %err, "cache delete failed");
                false
            }
        }
    }

    /// Closes the backend connection. The client stays usable as a no-op.
    pub async fn close(&self) {
        if let Some(backend) = self.backend.as_ref() {
            backend.close().await;
            info!(backend = backend.name(), "cache backend closed");
        }
    }
}
