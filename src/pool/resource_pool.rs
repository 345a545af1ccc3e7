//! Resource Pool Module
//!
//! Fixed-size pool of blocking native resources with bounded-wait acquisition.
//!
//! The pool itself is synchronous: a mutex-protected queue plus a condition
//! variable. The async entry points dispatch every blocking call to tokio's
//! blocking thread pool so an event loop thread never waits on the condvar.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::{self, JoinError};
use tracing::{debug, error, info, warn};

use crate::error::{PoolError, Result};
use crate::pool::{PoolStats, ResourceFactory};

/// Default bounded wait for a free resource.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// == Pool State ==
/// Everything guarded by the pool lock.
struct PoolState<R> {
    /// Resources waiting to be handed out
    idle: VecDeque<R>,
    /// Resources currently held by callers
    in_use: usize,
    closed: bool,
    acquired: u64,
    released: u64,
    exhausted: u64,
}

struct PoolInner<R: Send + 'static> {
    factory: Box<dyn ResourceFactory<Resource = R>>,
    state: Mutex<PoolState<R>>,
    /// Signalled whenever a resource goes back into `idle` or the pool closes
    returned: Condvar,
    size: usize,
    acquire_timeout: Duration,
}

impl<R: Send + 'static> PoolInner<R> {
    fn lock_state(&self) -> MutexGuard<'_, PoolState<R>> {
        // The lock is never held across user code, so a poisoned lock still
        // guards consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, resource: R) {
        let mut state = self.lock_state();
        state.in_use = state.in_use.saturating_sub(1);
        state.released += 1;

        if state.closed {
            drop(state);
            if let Err(err) = self.factory.close(resource) {
                warn!(error = %err, "failed to close resource released after shutdown");
            }
            return;
        }

        state.idle.push_back(resource);
        drop(state);
        self.returned.notify_one();
    }
}

// == Resource Pool ==
/// Bounded pool of `size` eagerly created resources.
///
/// Cloning is cheap and yields another handle to the same pool. A resource is
/// checked out to exactly one [`PooledResource`] at a time and goes back to the
/// pool when that guard is dropped.
pub struct ResourcePool<R: Send + 'static> {
    inner: Arc<PoolInner<R>>,
}

impl<R: Send + 'static> Clone for ResourcePool<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Send + 'static> fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("stats", &self.stats())
            .field("acquire_timeout", &self.inner.acquire_timeout)
            .finish()
    }
}

impl<R: Send + 'static> ResourcePool<R> {
    // == Constructor ==
    /// Creates `size` resources up front and returns the pool holding them.
    ///
    /// Creation runs on the calling thread and may block. If any resource
    /// fails, the ones already created are closed and the error is returned,
    /// so a pool never exists in a partially built state.
    ///
    /// # Arguments
    /// * `factory` - Creates and closes the resources
    /// * `size` - Number of resources, must be at least one
    /// * `acquire_timeout` - Bounded wait used by every acquisition
    pub fn initialize<F>(factory: F, size: usize, acquire_timeout: Duration) -> Result<Self>
    where
        F: ResourceFactory<Resource = R>,
    {
        if size == 0 {
            return Err(PoolError::InvalidConfig(
                "pool size must be at least 1".to_string(),
            ));
        }

        let mut idle = VecDeque::with_capacity(size);
        for index in 0..size {
            match factory.create() {
                Ok(resource) => idle.push_back(resource),
                Err(source) => {
                    error!(index, size, error = %source, "resource creation failed");
                    for resource in idle.drain(..) {
                        if let Err(err) = factory.close(resource) {
                            warn!(error = %err, "failed to close resource of aborted pool");
                        }
                    }
                    return Err(PoolError::ResourceCreation { index, source });
                }
            }
        }

        info!(
            size,
            acquire_timeout_ms = acquire_timeout.as_millis() as u64,
            "resource pool initialized"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                factory: Box::new(factory),
                state: Mutex::new(PoolState {
                    idle,
                    in_use: 0,
                    closed: false,
                    acquired: 0,
                    released: 0,
                    exhausted: 0,
                }),
                returned: Condvar::new(),
                size,
                acquire_timeout,
            }),
        })
    }

    // == Blocking Acquire ==
    /// Takes a resource, waiting at most the configured timeout.
    ///
    /// Blocks the calling thread. From async code use [`acquire`](Self::acquire)
    /// or [`scoped_acquire`](Self::scoped_acquire) instead.
    pub fn acquire_blocking(&self) -> Result<PooledResource<R>> {
        let timeout = self.inner.acquire_timeout;
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock_state();

        loop {
            if state.closed {
                return Err(PoolError::Closed);
            }

            if let Some(resource) = state.idle.pop_front() {
                state.in_use += 1;
                state.acquired += 1;
                debug!(in_use = state.in_use, "resource acquired");
                return Ok(PooledResource {
                    resource: Some(resource),
                    pool: Arc::clone(&self.inner),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                state.exhausted += 1;
                warn!(
                    size = self.inner.size,
                    timeout_ms = timeout.as_millis() as u64,
                    "resource pool exhausted"
                );
                return Err(PoolError::Exhausted { timeout });
            }

            let (guard, _) = self
                .inner
                .returned
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    // == Async Acquire ==
    /// Takes a resource without blocking the async runtime.
    ///
    /// The wait happens on a blocking worker thread. The returned guard gives
    /// the resource back when dropped; if this future is dropped after the
    /// worker obtained a resource, the resource goes straight back too.
    pub async fn acquire(&self) -> Result<PooledResource<R>> {
        let pool = self.clone();
        task::spawn_blocking(move || pool.acquire_blocking())
            .await
            .map_err(worker_failed)?
    }

    // == Async Release ==
    /// Returns a resource to its pool from a blocking worker thread.
    ///
    /// Dropping the guard does the same inline; this form keeps even the
    /// short lock acquisition off the async runtime.
    pub async fn release(&self, resource: PooledResource<R>) -> Result<()> {
        task::spawn_blocking(move || drop(resource))
            .await
            .map_err(worker_failed)
    }

    // == Scoped Acquire ==
    /// Acquires a resource, runs `f` with it and releases it.
    ///
    /// Acquisition, `f` and release all run on one blocking worker thread, so
    /// `f` may issue synchronous calls on the resource freely. The resource is
    /// released on every exit path; a panic in `f` is reported as
    /// [`PoolError::WorkerFailed`].
    pub async fn scoped_acquire<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut R) -> T + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.clone();
        task::spawn_blocking(move || {
            let mut resource = pool.acquire_blocking()?;
            Ok(f(&mut resource))
        })
        .await
        .map_err(worker_failed)?
    }

    // == Shutdown ==
    /// Closes the pool and every idle resource.
    ///
    /// Waiters and later acquisitions fail with [`PoolError::Closed`].
    /// Resources still checked out are closed when their guards drop.
    /// Returns the number of idle resources drained; calling it again
    /// returns 0.
    pub fn shutdown(&self) -> usize {
        let (drained, in_use) = {
            let mut state = self.inner.lock_state();
            if state.closed {
                return 0;
            }
            state.closed = true;
            let drained: Vec<R> = state.idle.drain(..).collect();
            (drained, state.in_use)
        };
        self.inner.returned.notify_all();

        let count = drained.len();
        for resource in drained {
            if let Err(err) = self.inner.factory.close(resource) {
                warn!(error = %err, "failed to close pooled resource");
            }
        }

        if in_use > 0 {
            warn!(in_use, "pool shut down while resources are checked out");
        }
        info!(closed = count, "resource pool shut down");
        count
    }

    // == Stats ==
    /// Returns a snapshot of the pool's occupancy and counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.lock_state();
        PoolStats {
            size: self.inner.size,
            available: state.idle.len(),
            in_use: state.in_use,
            acquired: state.acquired,
            released: state.released,
            exhausted: state.exhausted,
            closed: state.closed,
        }
    }

    /// Number of resources the pool was built with.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Number of resources currently waiting in the pool.
    pub fn available(&self) -> usize {
        self.inner.lock_state().idle.len()
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.inner.acquire_timeout
    }
}

fn worker_failed(err: JoinError) -> PoolError {
    if err.is_panic() {
        PoolError::WorkerFailed("pool worker panicked".to_string())
    } else {
        PoolError::WorkerFailed(err.to_string())
    }
}

// == Pooled Resource ==
/// A checked-out resource. Returns itself to the pool when dropped.
pub struct PooledResource<R: Send + 'static> {
    resource: Option<R>,
    pool: Arc<PoolInner<R>>,
}

impl<R: Send + 'static> Deref for PooledResource<R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource
            .as_ref()
            .expect("pooled resource is present until dropped")
    }
}

impl<R: Send + 'static> DerefMut for PooledResource<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.resource
            .as_mut()
            .expect("pooled resource is present until dropped")
    }
}

impl<R: Send + fmt::Debug + 'static> fmt::Debug for PooledResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledResource").field(&self.resource).finish()
    }
}

impl<R: Send + 'static> Drop for PooledResource<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.release(resource);
            debug!("resource released");
        }
    }
}
