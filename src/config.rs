//! Configuration Module
//!
//! Handles loading pool and cache settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Pool and cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of pooled connections created at startup
    pub pool_size: usize,
    /// Bounded wait for a free connection, in milliseconds
    pub acquire_timeout_ms: u64,
    /// DuckDB database path, `:memory:` for an in-process database
    pub duckdb_database: String,
    /// PostgreSQL connection URL, if a Postgres pool is wanted
    pub postgres_url: Option<String>,
    /// Attempts made to create each connection before giving up
    pub create_retries: u32,
    /// Cache backend URL; None disables the cache
    pub cache_url: Option<String>,
    /// Default TTL in seconds for memoized results
    pub cache_default_ttl: u64,
    /// Network timeout for a single cache operation, in milliseconds
    pub cache_op_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `POOL_SIZE` - Pooled connections (default: 4)
    /// - `POOL_ACQUIRE_TIMEOUT_MS` - Acquire wait in ms (default: 5000)
    /// - `DUCKDB_DATABASE` - DuckDB path (default: `:memory:`)
    /// - `POSTGRES_URL` - Postgres URL (default: unset)
    /// - `POOL_CREATE_RETRIES` - Creation attempts per connection (default: 5)
    /// - `VALKEY_URL` - Cache URL, `memory://` for in-process (default: unset)
    /// - `CACHE_DEFAULT_TTL` - TTL in seconds (default: 300)
    /// - `CACHE_OP_TIMEOUT_MS` - Cache op timeout in ms (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            pool_size: parse_var("POOL_SIZE").unwrap_or(defaults.pool_size),
            acquire_timeout_ms: parse_var("POOL_ACQUIRE_TIMEOUT_MS")
                .unwrap_or(defaults.acquire_timeout_ms),
            duckdb_database: non_empty_var("DUCKDB_DATABASE").unwrap_or(defaults.duckdb_database),
            postgres_url: non_empty_var("POSTGRES_URL"),
            create_retries: parse_var("POOL_CREATE_RETRIES").unwrap_or(defaults.create_retries),
            cache_url: non_empty_var("VALKEY_URL"),
            cache_default_ttl: parse_var("CACHE_DEFAULT_TTL").unwrap_or(defaults.cache_default_ttl),
            cache_op_timeout_ms: parse_var("CACHE_OP_TIMEOUT_MS")
                .unwrap_or(defaults.cache_op_timeout_ms),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn cache_op_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_op_timeout_ms)
    }

    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_default_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: 4,
            acquire_timeout_ms: 5000,
            duckdb_database: ":memory:".to_string(),
            postgres_url: None,
            create_retries: 5,
            cache_url: None,
            cache_default_ttl: 300,
            cache_op_timeout_ms: 5000,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
