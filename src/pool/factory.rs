//! Resource Factory Module
//!
//! Abstracts how pooled resources are created and closed.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::BoxError;

// == Resource Factory ==
/// Creates and closes the native resources held by a pool.
///
/// Both methods are synchronous and may block; the pool only calls them from
/// the thread that initializes or shuts it down.
pub trait ResourceFactory: Send + Sync + 'static {
    /// The pooled resource type
    type Resource: Send + 'static;

    /// Creates one resource.
    fn create(&self) -> Result<Self::Resource, BoxError>;

    /// Closes one resource. Dropping it is enough for most native handles.
    fn close(&self, resource: Self::Resource) -> Result<(), BoxError> {
        drop(resource);
        Ok(())
    }
}

// == Closure Factory ==
/// Adapts a closure into a [`ResourceFactory`].
#[derive(Debug, Clone)]
pub struct FnFactory<F> {
    create: F,
}

/// Wraps `create` so it can be passed to [`ResourcePool::initialize`](super::ResourcePool::initialize).
pub fn from_fn<F, R, E>(create: F) -> FnFactory<F>
where
    F: Fn() -> Result<R, E> + Send + Sync + 'static,
    R: Send + 'static,
    E: Into<BoxError>,
{
    FnFactory { create }
}

impl<F, R, E> ResourceFactory for FnFactory<F>
where
    F: Fn() -> Result<R, E> + Send + Sync + 'static,
    R: Send + 'static,
    E: Into<BoxError>,
{
    type Resource = R;

    fn create(&self) -> Result<R, BoxError> {
        (self.create)().map_err(Into::into)
    }
}

// == Retrying Factory ==
/// Retries resource creation with exponential backoff.
///
/// Useful for servers that may still be starting when the pool is built.
/// The last error is returned once every attempt failed.
#[derive(Debug, Clone)]
pub struct RetryingFactory<F> {
    inner: F,
    attempts: u32,
    initial_delay: Duration,
}

impl<F: ResourceFactory> RetryingFactory<F> {
    /// `attempts` is clamped to at least one.
    pub fn new(inner: F, attempts: u32, initial_delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            initial_delay,
        }
    }
}

impl<F: ResourceFactory> ResourceFactory for RetryingFactory<F> {
    type Resource = F::Resource;

    fn create(&self) -> Result<Self::Resource, BoxError> {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            match self.inner.create() {
                Ok(resource) => return Ok(resource),
                Err(err) if attempt < self.attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.attempts,
                        retry_delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "resource creation failed, retrying"
                    );
                    thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn close(&self, resource: Self::Resource) -> Result<(), BoxError> {
        self.inner.close(resource)
    }
}
