//! PostgreSQL connection factory.

use postgres::{Client, NoTls};
use tracing::debug;

use crate::config::Config;
use crate::error::{BoxError, PoolError};
use crate::pool::ResourceFactory;

/// Creates one synchronous Postgres client per pooled handle.
///
/// `postgres::Client` drives its own runtime internally, so clients must be
/// used from blocking threads, which is what
/// [`ResourcePool::scoped_acquire`](crate::pool::ResourcePool::scoped_acquire)
/// provides.
#[derive(Debug, Clone)]
pub struct PostgresFactory {
    url: String,
    application_name: String,
}

impl PostgresFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            application_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    /// Builds a factory for `config.postgres_url`.
    ///
    /// Fails with [`PoolError::InvalidConfig`] when no URL is configured.
    pub fn from_config(config: &Config) -> Result<Self, PoolError> {
        config
            .postgres_url
            .as_deref()
            .map(Self::new)
            .ok_or_else(|| PoolError::InvalidConfig("POSTGRES_URL is not set".to_string()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sets the `application_name` reported to the server.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}

impl ResourceFactory for PostgresFactory {
    type Resource = Client;

    fn create(&self) -> Result<Client, BoxError> {
        let mut config: postgres::Config = self.url.parse()?;
        config.application_name(&self.application_name);
        let client = config.connect(NoTls)?;
        debug!(application_name = %self.application_name, "postgres connection opened");
        Ok(client)
    }

    fn close(&self, resource: Client) -> Result<(), BoxError> {
        resource.close().map_err(Into::into)
    }
}
