//! Lazily-initialized shared handles for the heavyweight generative model.
//!
//! Loading the instrumental model is expensive and its on-disk cache can be
//! left corrupt by an interrupted download. The loader hands every concurrent
//! caller the same in-flight load, retries a failed load once after purging
//! the cache, and leaves terminal failures uncached so a later call starts
//! fresh.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::warn;

/// Hard deadline for one generation call made with acquired handles
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors surfaced by the loader
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Both the initial load and the post-purge retry failed
    #[error("model load failed after cache purge and retry: {0}")]
    Exhausted(String),

    /// The generation call lost the race against the deadline
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Where model handles come from.
///
/// `load` acquires and validates the handles, downloading into the on-disk
/// cache as needed. `purge_cache` removes that cache; a missing directory is
/// not an error.
#[async_trait]
pub trait ModelSource: Send + Sync + 'static {
    type Handles: Send + Sync + 'static;

    async fn load(&self) -> Result<Self::Handles>;

    async fn purge_cache(&self) -> Result<()>;
}

type SharedLoad<H> = Shared<BoxFuture<'static, Result<Arc<H>, LoadError>>>;

enum LoadState<H> {
    Empty,
    Loading(SharedLoad<H>),
    Ready(Arc<H>),
}

/// Process-wide owner of the cached handle pair
pub struct ResourceLoader<S: ModelSource> {
    source: Arc<S>,
    state: Mutex<LoadState<S::Handles>>,
}

impl<S: ModelSource> ResourceLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            state: Mutex::new(LoadState::Empty),
        }
    }

    /// Get the cached handles, joining an in-flight load or starting one.
    ///
    /// Exactly one underlying load runs no matter how many callers arrive
    /// concurrently; they all observe the same result. A terminal failure is
    /// returned to every waiter but not cached.
    pub async fn acquire(&self) -> Result<Arc<S::Handles>, LoadError> {
        let shared = {
            let mut state = self.state.lock().expect("loader state poisoned");
            match &*state {
                LoadState::Ready(handles) => return Ok(Arc::clone(handles)),
                LoadState::Loading(in_flight) => in_flight.clone(),
                LoadState::Empty => {
                    let source = Arc::clone(&self.source);
                    let load = async move { Self::load_with_retry(source).await }
                        .boxed()
                        .shared();
                    *state = LoadState::Loading(load.clone());
                    load
                }
            }
        };

        let result = shared.await;

        let mut state = self.state.lock().expect("loader state poisoned");
        if matches!(&*state, LoadState::Loading(_)) {
            *state = match &result {
                Ok(handles) => LoadState::Ready(Arc::clone(handles)),
                Err(_) => LoadState::Empty,
            };
        }

        result
    }

    /// Drop any cached or in-flight state; the next `acquire` loads fresh
    pub fn invalidate(&self) {
        let mut state = self.state.lock().expect("loader state poisoned");
        *state = LoadState::Empty;
    }

    async fn load_with_retry(source: Arc<S>) -> Result<Arc<S::Handles>, LoadError> {
        let first = match source.load().await {
            Ok(handles) => return Ok(Arc::new(handles)),
            Err(err) => err,
        };

        warn!(
            error = format!("{first:#}"),
            "Model load failed, purging cache and retrying"
        );

        if let Err(purge_err) = source.purge_cache().await {
            warn!(error = format!("{purge_err:#}"), "Cache purge failed");
        }

        match source.load().await {
            Ok(handles) => Ok(Arc::new(handles)),
            Err(second) => Err(LoadError::Exhausted(format!("{second:#}"))),
        }
    }
}

/// Race a generation call against [`GENERATION_TIMEOUT`].
///
/// The call runs as its own task: on timeout it is abandoned, not killed.
/// The external work may not be interruptible and is left to finish on its
/// own, while the caller gets a timeout error.
pub async fn run_generation<T, F>(fut: F) -> Result<T>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T>> + Send + 'static,
{
    let task = tokio::spawn(fut);

    match tokio::time::timeout(GENERATION_TIMEOUT, task).await {
        Ok(joined) => joined.map_err(|err| anyhow!("generation task panicked: {err}"))?,
        Err(_) => Err(LoadError::Timeout(GENERATION_TIMEOUT).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubSource {
        loads: AtomicU32,
        purges: AtomicU32,
        fail_first: u32,
    }

    impl StubSource {
        fn failing_first(n: u32) -> Self {
            Self {
                loads: AtomicU32::new(0),
                purges: AtomicU32::new(0),
                fail_first: n,
            }
        }
    }

    #[async_trait]
    impl ModelSource for StubSource {
        type Handles = String;

        async fn load(&self) -> Result<String> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                anyhow::bail!("corrupt cache (attempt {attempt})");
            }
            Ok("handles".to_string())
        }

        async fn purge_cache(&self) -> Result<()> {
            self.purges.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_acquire_caches_after_first_load() {
        let loader = ResourceLoader::new(StubSource::failing_first(0));

        let first = loader.acquire().await.unwrap();
        let second = loader.acquire().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_purges_and_retries_once() {
        let loader = ResourceLoader::new(StubSource::failing_first(1));

        let handles = loader.acquire().await.unwrap();
        assert_eq!(*handles, "handles");
        assert_eq!(loader.source.loads.load(Ordering::SeqCst), 2);
        assert_eq!(loader.source.purges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminal_failure_not_cached() {
        let loader = ResourceLoader::new(StubSource::failing_first(2));

        let err = loader.acquire().await.unwrap_err();
        assert!(matches!(err, LoadError::Exhausted(_)));
        assert_eq!(loader.source.loads.load(Ordering::SeqCst), 2);

        // Next acquire starts a fresh attempt and succeeds.
        let handles = loader.acquire().await.unwrap();
        assert_eq!(*handles, "handles");
        assert_eq!(loader.source.loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let loader = ResourceLoader::new(StubSource::failing_first(0));

        loader.acquire().await.unwrap();
        loader.invalidate();
        loader.acquire().await.unwrap();

        assert_eq!(loader.source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generation_timeout_is_specific() {
        tokio::time::pause();

        let never = async {
            std::future::pending::<()>().await;
            Ok(())
        };

        let racing = tokio::spawn(run_generation(never));
        tokio::time::advance(GENERATION_TIMEOUT + Duration::from_secs(1)).await;

        let err = racing.await.unwrap().unwrap_err();
        let load_err = err.downcast_ref::<LoadError>().expect("typed timeout error");
        assert!(matches!(load_err, LoadError::Timeout(_)));
    }
}
