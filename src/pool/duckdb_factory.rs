//! DuckDB connection factory.

use std::sync::{Mutex, PoisonError};

use duckdb::Connection;
use tracing::{info, warn};

use crate::error::BoxError;
use crate::pool::ResourceFactory;

/// Database name that selects an in-process DuckDB database.
pub const IN_MEMORY: &str = ":memory:";

/// Creates DuckDB connections that all share one database.
///
/// The factory opens a root connection once; each pooled connection is a
/// clone of it. Init statements (extension loading, settings) run on every
/// new connection. A failing init statement is logged and skipped, since
/// extensions are optional for most queries.
pub struct DuckDbFactory {
    root: Mutex<Connection>,
    init_statements: Vec<String>,
}

impl DuckDbFactory {
    /// Opens `database`, either a file path or [`IN_MEMORY`].
    pub fn open(database: &str) -> Result<Self, BoxError> {
        let root = if database == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(database)?
        };
        info!(database, "duckdb database opened");
        Ok(Self {
            root: Mutex::new(root),
            init_statements: Vec::new(),
        })
    }

    /// Adds a statement executed on every new connection.
    pub fn with_init_statement(mut self, sql: impl Into<String>) -> Self {
        self.init_statements.push(sql.into());
        self
    }
}

impl ResourceFactory for DuckDbFactory {
    type Resource = Connection;

    fn create(&self) -> Result<Connection, BoxError> {
        let conn = self
            .root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_clone()?;

        for sql in &self.init_statements {
            if let Err(err) = conn.execute_batch(sql) {
                warn!(statement = %sql, error = %err, "duckdb init statement failed");
            }
        }
        Ok(conn)
    }

    fn close(&self, resource: Connection) -> Result<(), BoxError> {
        resource.close().map_err(|(_, err)| err.into())
    }
}
