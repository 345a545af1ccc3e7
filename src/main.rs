//! Pooled Cache demo
//!
//! Runs a DuckDB aggregation through the connection pool twice with the
//! memoizer in front of it: the first call computes, the second is served
//! from the cache. With the `postgres` feature and `POSTGRES_URL` set, a
//! Postgres pool is opened and checked as well.

use std::time::Duration;

use anyhow::Context as _;
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pooled_cache::cache::MEMORY_URL;
use pooled_cache::pool::DuckDbFactory;
use pooled_cache::{AppContext, Config, ResourcePool};

/// Arguments of the memoized query.
#[derive(Debug, Clone, Serialize)]
struct BatchQuery {
    batch_id: String,
    size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CategoryStats {
    category: i32,
    count: i64,
    mean: f64,
    max_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BatchStats {
    batch_id: String,
    rows: u32,
    categories: Vec<CategoryStats>,
}

fn batch_stats_query(conn: &mut Connection, size: u32) -> duckdb::Result<Vec<CategoryStats>> {
    let sql = format!(
        "SELECT CAST(i % 5 AS INTEGER) AS category, \
                count(*) AS n, \
                avg(i * 10) AS mean, \
                CAST(max(i * 10) AS DOUBLE) AS max_value \
         FROM range({}) t(i) \
         GROUP BY category \
         ORDER BY category",
        size
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![], |row| {
        Ok(CategoryStats {
            category: row.get(0)?,
            count: row.get(1)?,
            mean: row.get(2)?,
            max_value: row.get(3)?,
        })
    })?;
    rows.collect()
}

async fn compute_batch_stats(
    pool: ResourcePool<Connection>,
    query: BatchQuery,
) -> anyhow::Result<BatchStats> {
    let size = query.size;
    let categories = pool
        .scoped_acquire(move |conn| batch_stats_query(conn, size))
        .await??;

    Ok(BatchStats {
        batch_id: query.batch_id,
        rows: size,
        categories,
    })
}

/// Opens a Postgres pool from `POSTGRES_URL` and checks one connection.
#[cfg(feature = "postgres")]
async fn check_postgres(config: &Config) -> anyhow::Result<()> {
    use pooled_cache::context::initialize_pool;
    use pooled_cache::pool::PostgresFactory;

    if config.postgres_url.is_none() {
        info!("POSTGRES_URL not set, skipping the Postgres pool");
        return Ok(());
    }

    let factory = PostgresFactory::from_config(config)?;
    let pool = initialize_pool(factory, config)
        .await
        .context("failed to initialize the Postgres pool")?;
    let version: String = pool
        .scoped_acquire(|client| {
            client
                .query_one("SELECT version()", &[])
                .map(|row| row.get::<_, String>(0))
        })
        .await??;
    info!(pool_size = pool.size(), version = %version, "postgres pool ready");

    tokio::task::spawn_blocking(move || pool.shutdown()).await?;
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn check_postgres(_config: &Config) -> anyhow::Result<()> {
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pooled_cache=info,pooled_cache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if config.cache_url.is_none() {
        info!("VALKEY_URL not set, using the in-process cache backend");
        config.cache_url = Some(MEMORY_URL.to_string());
    }
    info!(
        "Configuration loaded: pool_size={}, database={}, acquire_timeout={}ms, ttl={}s",
        config.pool_size, config.duckdb_database, config.acquire_timeout_ms, config.cache_default_ttl
    );

    let factory = DuckDbFactory::open(&config.duckdb_database)
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to open DuckDB database")?;
    let ctx = AppContext::from_config(&config, factory)
        .await
        .context("failed to initialize the connection pool")?;

    let pool = ctx.pool()?.clone();
    let batch_stats = ctx
        .memoizer()
        .memoize("batch_stats", ctx.default_ttl(), move |query: BatchQuery| {
            compute_batch_stats(pool.clone(), query)
        });

    let query = BatchQuery {
        batch_id: "test-batch-001".to_string(),
        size: 5000,
    };

    let first = batch_stats.call(query.clone()).await?;
    info!(
        cache_hit = first.cache_hit,
        cache_time_ms = first.cache_time_ms,
        "first call: {}",
        serde_json::to_string(&first)?
    );

    // Let the background write-back land before asking again
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = batch_stats.call(query).await?;
    info!(
        cache_hit = second.cache_hit,
        cache_time_ms = second.cache_time_ms,
        "second call served from {:?}",
        second.source
    );
    let summary = second.into_data();
    for category in &summary.categories {
        info!(
            batch_id = %summary.batch_id,
            category = category.category,
            count = category.count,
            mean = category.mean,
            max_value = category.max_value,
            "category stats"
        );
    }

    info!(
        "pool stats: {}, cache stats: {}",
        serde_json::to_string(&ctx.pool()?.stats())?,
        serde_json::to_string(&ctx.cache().stats())?
    );

    ctx.shutdown().await;

    check_postgres(&config).await?;
    info!("Demo complete");
    Ok(())
}
