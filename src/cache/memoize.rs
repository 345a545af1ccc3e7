//! Cache-Aside Memoizer
//!
//! Wraps an async computation so results are served from the cache when
//! present and computed, returned and written back in the background when
//! not.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{derive_key, CacheClient, CallArgs};
use crate::error::CacheError;

// == Envelope ==
/// Where an envelope's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Computed,
}

/// Result of a memoized call plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<R> {
    pub data: R,
    pub cache_hit: bool,
    /// Time spent on the cache lookup, in milliseconds
    pub cache_time_ms: f64,
    pub source: Source,
}

impl<R> Envelope<R> {
    fn hit(data: R, cache_time_ms: f64) -> Self {
        Self {
            data,
            cache_hit: true,
            cache_time_ms,
            source: Source::Cache,
        }
    }

    fn computed(data: R, cache_time_ms: f64) -> Self {
        Self {
            data,
            cache_hit: false,
            cache_time_ms,
            source: Source::Computed,
        }
    }

    pub fn into_data(self) -> R {
        self.data
    }
}

// == Memoizer ==
/// Builds memoized computations on top of one cache client.
#[derive(Debug, Clone)]
pub struct Memoizer {
    cache: CacheClient,
}

impl Memoizer {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CacheClient {
        &self.cache
    }

    /// Wraps `compute` with the cache.
    ///
    /// Keys are `key_prefix` plus a hash of the call's arguments. Every
    /// value written by the returned computation expires after `ttl`.
    pub fn memoize<F>(&self, key_prefix: impl Into<String>, ttl: Duration, compute: F) -> Memoized<F> {
        Memoized {
            cache: self.cache.clone(),
            key_prefix: key_prefix.into(),
            ttl,
            compute,
        }
    }
}

// == Memoized ==
/// A computation wrapped by [`Memoizer::memoize`].
///
/// Concurrent calls that miss on the same key are not coalesced: each one
/// runs the computation and writes the result back.
#[derive(Debug, Clone)]
pub struct Memoized<F> {
    cache: CacheClient,
    key_prefix: String,
    ttl: Duration,
    compute: F,
}

impl<F> Memoized<F> {
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key used for `args`.
    pub fn key_for<A: Serialize + ?Sized>(&self, args: &A) -> Result<String, CacheError> {
        let call = CallArgs::from_serialize(args)?;
        Ok(derive_key(&self.key_prefix, &call))
    }

    // == Call ==
    /// Returns the cached result for `args`, or computes it.
    ///
    /// On a miss the result is returned as soon as it is computed; the cache
    /// write runs on a detached task. Cache failures only make the call a
    /// miss. Errors from the computation are returned as-is and nothing is
    /// cached for them.
    pub async fn call<A, Fut, R, E>(&self, args: A) -> Result<Envelope<R>, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        A: Serialize,
        R: Serialize + DeserializeOwned,
    {
        if !self.cache.is_enabled() {
            let data = (self.compute)(args).await?;
            return Ok(Envelope::computed(data, 0.0));
        }

        let key = match self.key_for(&args) {
            Ok(key) => key,
            Err(err) => {
                warn!(prefix = %self.key_prefix, error = %err, "cache key derivation failed, bypassing cache");
                let data = (self.compute)(args).await?;
                return Ok(Envelope::computed(data, 0.0));
            }
        };

        let lookup_started = Instant::now();
        let cached: Option<R> = self.cache.get_json(&key).await;
        let cache_time_ms = lookup_started.elapsed().as_secs_f64() * 1000.0;

        if let Some(data) = cached {
            debug!(key = %key, cache_time_ms, "cache hit");
            return Ok(Envelope::hit(data, cache_time_ms));
        }

        debug!(key = %key, cache_time_ms, "cache miss");
        let data = (self.compute)(args).await?;

        match serde_json::to_vec(&data) {
            Ok(bytes) => {
                self.cache.set_detached(key, bytes, self.ttl);
            }
            Err(err) => {
                warn!(key = %key, error = %err, "computed value could not be serialized for caching");
            }
        }

        Ok(Envelope::computed(data, cache_time_ms))
    }
}
