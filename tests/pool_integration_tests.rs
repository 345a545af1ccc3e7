//! Integration Tests for the Resource Pool
//!
//! Exercises the pool through its public async API under contention.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pooled_cache::pool::{from_fn, ResourcePool};
use pooled_cache::PoolError;

// == Helper Functions ==

/// Pool whose resources are sequential ids.
fn id_pool(size: usize, timeout: Duration) -> ResourcePool<usize> {
    let next = AtomicUsize::new(0);
    ResourcePool::initialize(
        from_fn(move || Ok::<_, std::io::Error>(next.fetch_add(1, Ordering::SeqCst))),
        size,
        timeout,
    )
    .unwrap()
}

/// Tracks how many callers hold a resource and the highest count seen.
#[derive(Default)]
struct InUseGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InUseGauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

// == Contention ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_callers_on_two_resources_serialize() {
    let pool = id_pool(2, Duration::from_secs(5));
    let gauge = Arc::new(InUseGauge::default());
    let holders = Arc::new(Mutex::new(HashSet::new()));

    let started = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..3 {
        let pool = pool.clone();
        let gauge = gauge.clone();
        let holders = holders.clone();
        tasks.push(tokio::spawn(async move {
            pool.scoped_acquire(move |id| {
                gauge.enter();
                // No other caller may hold this id right now
                assert!(holders.lock().unwrap().insert(*id));
                std::thread::sleep(Duration::from_millis(50));
                assert!(holders.lock().unwrap().remove(id));
                gauge.exit();
            })
            .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(pool.available(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_held_guards_across_awaits_respect_capacity() {
    let pool = id_pool(3, Duration::from_secs(5));
    let gauge = Arc::new(InUseGauge::default());

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let pool = pool.clone();
        let gauge = gauge.clone();
        tasks.push(tokio::spawn(async move {
            let resource = pool.acquire().await?;
            gauge.enter();
            tokio::time::sleep(Duration::from_millis(10)).await;
            gauge.exit();
            pool.release(resource).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stats = pool.stats();
    assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(stats.acquired, 10);
    assert_eq!(stats.released, 10);
    assert_eq!(stats.available, 3);
}

// == Exhaustion ==

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_extra_caller_gets_pool_exhausted() {
    let pool = id_pool(2, Duration::from_millis(100));

    let first = pool.acquire().await.unwrap();
    let second = pool.acquire().await.unwrap();

    let started = Instant::now();
    let third = pool.acquire().await;

    assert!(matches!(third, Err(PoolError::Exhausted { .. })));
    assert!(started.elapsed() >= Duration::from_millis(100));

    drop(first);
    let retry = pool.acquire().await;
    assert!(retry.is_ok());
    drop(second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_waiter_gets_resource_released_before_timeout() {
    let pool = id_pool(1, Duration::from_secs(2));
    let held = pool.acquire().await.unwrap();
    let held_id = *held;

    let releaser = {
        let pool = pool.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            pool.release(held).await
        })
    };

    let next = pool.acquire().await.unwrap();
    assert_eq!(*next, held_id);
    releaser.await.unwrap().unwrap();
}

// == Release Accounting ==

#[tokio::test]
async fn test_mixed_outcomes_keep_counts_balanced() {
    let pool = id_pool(2, Duration::from_millis(200));

    let mut outcomes = Vec::new();
    for round in 0..12usize {
        let outcome = pool
            .scoped_acquire(move |id| {
                if round % 4 == 3 {
                    panic!("simulated driver crash");
                }
                if round % 2 == 1 {
                    Err(format!("query on connection {} failed", id))
                } else {
                    Ok(*id)
                }
            })
            .await;
        outcomes.push(outcome);
    }

    let panics = outcomes
        .iter()
        .filter(|o| matches!(o, Err(PoolError::WorkerFailed(_))))
        .count();
    assert_eq!(panics, 3);

    let stats = pool.stats();
    assert_eq!(stats.acquired, 12);
    assert_eq!(stats.released, 12);
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.available, 2);
}
