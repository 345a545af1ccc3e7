//! Pool Module
//!
//! Bounded pools of blocking native resources such as database connections.

mod factory;
mod resource_pool;
mod stats;

#[cfg(feature = "duckdb")]
mod duckdb_factory;
#[cfg(feature = "postgres")]
mod postgres_factory;

// Re-export public types
pub use factory::{from_fn, FnFactory, ResourceFactory, RetryingFactory};
pub use resource_pool::{PooledResource, ResourcePool, DEFAULT_ACQUIRE_TIMEOUT};
pub use stats::PoolStats;

#[cfg(feature = "duckdb")]
pub use duckdb_factory::{DuckDbFactory, IN_MEMORY};
#[cfg(feature = "postgres")]
pub use postgres_factory::PostgresFactory;
