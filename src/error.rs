//! Error types for the pool and cache layers
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Boxed error returned by resource factories and backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Pool Error Enum ==
/// Errors surfaced by the resource pool to its immediate caller.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Pool used before it was initialized
    #[error("Pool not initialized: {0}")]
    NotInitialized(String),

    /// No resource became available within the bounded wait
    #[error("Connection pool exhausted - no connections available after {timeout:?}")]
    Exhausted { timeout: Duration },

    /// A resource could not be created during initialization
    #[error("Failed to create resource #{index}: {source}")]
    ResourceCreation {
        index: usize,
        #[source]
        source: BoxError,
    },

    /// Rejected pool parameters
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// Pool has been shut down
    #[error("Pool is shut down")]
    Closed,

    /// The blocking worker running pool work failed or panicked
    #[error("Pool worker failed: {0}")]
    WorkerFailed(String),
}

impl PoolError {
    /// Returns true when retrying the whole operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PoolError::Exhausted { .. })
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for PoolError {
    fn into_response(self) -> Response {
        let status = match &self {
            PoolError::Exhausted { .. } | PoolError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "retryable": self.is_transient(),
        }));

        (status, body).into_response()
    }
}

// == Cache Error Enum ==
/// Cache backend failures. These are absorbed by the cache client and never
/// reach callers of the memoizer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend is not reachable
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer in time
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// Value or arguments could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Any other backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            CacheError::Unavailable(err.to_string())
        } else if err.is_timeout() {
            CacheError::Backend(format!("timeout: {}", err))
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
