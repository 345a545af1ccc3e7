//! Redis / Valkey Cache Backend
//!
//! [`CacheBackend`] over the Redis wire protocol using a multiplexed,
//! auto-reconnecting connection.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::cache::CacheBackend;
use crate::error::CacheError;

// == Redis Backend ==
/// Shared client for a Redis-compatible server.
///
/// The connection manager is cloned per operation; clones share one
/// multiplexed connection, so no extra locking is layered on top.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    url: String,
}

impl RedisBackend {
    /// Connects to `url`. `valkey://` and `valkeys://` are accepted as
    /// aliases of `redis://` and `rediss://`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let url = normalize_url(url);
        let client = redis::Client::open(url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        info!(url = %redact_url(&url), "redis backend connected");
        Ok(Self { conn, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn setex(&self, key: &str, ttl: Duration, value: Vec<u8>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// Rewrites Valkey URL schemes to the Redis schemes the client understands.
pub fn normalize_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("valkeys://") {
        format!("rediss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("valkey://") {
        format!("redis://{}", rest)
    } else {
        url.to_string()
    }
}

/// SETEX takes whole seconds and rejects zero; round up.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Hides the password part of a URL for logging.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
