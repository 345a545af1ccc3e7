//! Application Context
//!
//! Owns the connection pool and the cache for the lifetime of the process.
//! Built once at startup and handed to whatever needs it.

use std::time::Duration;

use tokio::task;
use tracing::{error, info};

use crate::cache::{CacheClient, Memoizer};
use crate::config::Config;
use crate::error::{PoolError, Result};
use crate::pool::{ResourceFactory, ResourcePool, RetryingFactory};

/// First delay between connection attempts at startup; doubles each retry.
pub const CREATE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Shared state passed to request handlers and jobs.
///
/// Cloning is cheap; clones share the pool and the cache.
pub struct AppContext<R: Send + 'static> {
    pool: Option<ResourcePool<R>>,
    memoizer: Memoizer,
    default_ttl: Duration,
}

impl<R: Send + 'static> Clone for AppContext<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            memoizer: self.memoizer.clone(),
            default_ttl: self.default_ttl,
        }
    }
}

impl<R: Send + 'static> AppContext<R> {
    /// Creates a context from already built parts.
    pub fn new(pool: Option<ResourcePool<R>>, cache: CacheClient) -> Self {
        Self {
            pool,
            memoizer: Memoizer::new(cache),
            default_ttl: crate::cache::DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Builds the pool and the cache described by `config`.
    ///
    /// Pool creation failure is fatal and returned. Cache connection failure
    /// is not: the context then runs with the cache disabled.
    pub async fn from_config<F>(config: &Config, factory: F) -> Result<Self>
    where
        F: ResourceFactory<Resource = R>,
    {
        let pool = initialize_pool(factory, config).await?;

        let cache = match config.cache_url.as_deref() {
            Some(url) => CacheClient::connect(url, config.cache_op_timeout()).await,
            None => {
                info!("no cache URL configured, cache disabled");
                CacheClient::disabled()
            }
        };

        info!(
            pool_size = pool.size(),
            cache_backend = cache.backend_name().unwrap_or("disabled"),
            "application context ready"
        );
        Ok(Self::new(Some(pool), cache).with_default_ttl(config.cache_default_ttl()))
    }

    /// Returns the pool, or [`PoolError::NotInitialized`] when the context
    /// was built without one.
    pub fn pool(&self) -> Result<&ResourcePool<R>> {
        self.pool
            .as_ref()
            .ok_or_else(|| PoolError::NotInitialized("no connection pool configured".to_string()))
    }

    pub fn cache(&self) -> &CacheClient {
        self.memoizer.cache()
    }

    pub fn memoizer(&self) -> &Memoizer {
        &self.memoizer
    }

    /// TTL for call sites that do not choose their own.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Closes the pool's resources and the cache connection.
    pub async fn shutdown(&self) {
        if let Some(pool) = self.pool.clone() {
            if let Err(err) = task::spawn_blocking(move || pool.shutdown()).await {
                error!(error = %err, "pool shutdown failed");
            }
        }
        self.cache().close().await;
        info!("application context shut down");
    }
}

/// Creates a pool per `config` on a blocking worker thread.
///
/// Each connection is attempted `config.create_retries` times with
/// exponential backoff before the pool gives up.
pub async fn initialize_pool<F>(factory: F, config: &Config) -> Result<ResourcePool<F::Resource>>
where
    F: ResourceFactory,
{
    let factory = RetryingFactory::new(factory, config.create_retries, CREATE_RETRY_DELAY);
    let size = config.pool_size;
    let timeout = config.acquire_timeout();

    task::spawn_blocking(move || ResourcePool::initialize(factory, size, timeout))
        .await
        .map_err(|err| PoolError::WorkerFailed(err.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MEMORY_URL;
    use crate::pool::from_fn;

    fn test_config() -> Config {
        Config {
            pool_size: 2,
            acquire_timeout_ms: 100,
            create_retries: 1,
            cache_url: Some(MEMORY_URL.to_string()),
            cache_default_ttl: 60,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_from_config_builds_pool_and_cache() {
        let ctx = AppContext::from_config(&test_config(), from_fn(|| Ok::<_, std::io::Error>(0u8)))
            .await
            .unwrap();

        assert_eq!(ctx.pool().unwrap().size(), 2);
        assert_eq!(ctx.cache().backend_name(), Some("memory"));
        assert_eq!(ctx.default_ttl(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_from_config_without_cache_url() {
        let config = Config {
            cache_url: None,
            ..test_config()
        };
        let ctx = AppContext::from_config(&config, from_fn(|| Ok::<_, std::io::Error>(0u8)))
            .await
            .unwrap();

        assert!(!ctx.cache().is_enabled());
    }

    #[tokio::test]
    async fn test_from_config_fails_on_resource_error() {
        let result = AppContext::from_config(&test_config(), from_fn(|| Err::<u8, _>("refused"))).await;
        assert!(matches!(result, Err(PoolError::ResourceCreation { index: 0, .. })));
    }

    #[tokio::test]
    async fn test_pool_not_initialized() {
        let ctx: AppContext<u8> = AppContext::new(None, CacheClient::disabled());
        assert!(matches!(ctx.pool(), Err(PoolError::NotInitialized(_))));
    }

    #[tokio::test]
    async fn test_shutdown_closes_pool() {
        let ctx = AppContext::from_config(&test_config(), from_fn(|| Ok::<_, std::io::Error>(0u8)))
            .await
            .unwrap();
        let pool = ctx.pool().unwrap().clone();

        ctx.shutdown().await;

        assert!(pool.stats().closed);
        assert!(matches!(pool.acquire().await, Err(PoolError::Closed)));
    }
}
