//! Pooled Cache - bounded resource pools and cache-aside memoization
//!
//! Provides a fixed-size pool for blocking native connections and a
//! memoizer that serves repeated calls from a Redis-compatible cache.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod pool;
pub mod tasks;

pub use cache::{CacheClient, Envelope, Memoizer, Source};
pub use config::Config;
pub use context::AppContext;
pub use error::{CacheError, PoolError};
pub use pool::{PooledResource, ResourcePool};
