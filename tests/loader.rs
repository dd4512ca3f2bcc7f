//! Resource Loader Tests
//!
//! The contract under concurrency: one underlying load no matter how many
//! callers, purge-and-retry on failure, terminal failures not cached.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use commit_karaoke::core::{ModelSource, ResourceLoader};

#[derive(Default)]
struct Counters {
    loads: AtomicU32,
    purges: AtomicU32,
    failures_left: AtomicU32,
}

struct SlowSource {
    counters: Arc<Counters>,
}

fn slow_source(failures: u32) -> (SlowSource, Arc<Counters>) {
    let counters = Arc::new(Counters {
        failures_left: AtomicU32::new(failures),
        ..Default::default()
    });
    (
        SlowSource {
            counters: Arc::clone(&counters),
        },
        counters,
    )
}

#[async_trait]
impl ModelSource for SlowSource {
    type Handles = &'static str;

    async fn load(&self) -> Result<&'static str> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        // Long enough for every concurrent caller to arrive mid-load.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let left = self.counters.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.counters.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("artifact failed validation");
        }
        Ok("handles")
    }

    async fn purge_cache(&self) -> Result<()> {
        self.counters.purges.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_concurrent_acquires_share_one_load() {
    let (source, counters) = slow_source(0);
    let loader = Arc::new(ResourceLoader::new(source));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let loader = Arc::clone(&loader);
        tasks.push(tokio::spawn(async move { loader.acquire().await }));
    }

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap());
    }

    assert_eq!(counters.loads.load(Ordering::SeqCst), 1);

    // Every caller got the same cached pair.
    for pair in handles.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
    }
}

#[tokio::test]
async fn test_corrupt_cache_recovers_via_purge() {
    let (source, counters) = slow_source(1);
    let loader = ResourceLoader::new(source);

    let handles = loader.acquire().await.unwrap();
    assert_eq!(*handles, "handles");
    assert_eq!(counters.loads.load(Ordering::SeqCst), 2);
    assert_eq!(counters.purges.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exhausted_retries_fail_all_waiters_then_reset() {
    let (source, counters) = slow_source(2);
    let loader = Arc::new(ResourceLoader::new(source));

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let loader = Arc::clone(&loader);
        tasks.push(tokio::spawn(async move { loader.acquire().await }));
    }

    for task in tasks {
        assert!(task.await.unwrap().is_err(), "every waiter sees the failure");
    }

    // One load plus one retry, despite four waiters.
    assert_eq!(counters.loads.load(Ordering::SeqCst), 2);

    // The failure is not cached: the next call starts a fresh load.
    let handles = loader.acquire().await.unwrap();
    assert_eq!(*handles, "handles");
    assert_eq!(counters.loads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_acquire_after_success_skips_the_source() {
    let (source, counters) = slow_source(0);
    let loader = ResourceLoader::new(source);

    loader.acquire().await.unwrap();
    loader.acquire().await.unwrap();
    loader.acquire().await.unwrap();

    assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
}
