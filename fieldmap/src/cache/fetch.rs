//! Outstanding network fetches and the worker pool that runs them.

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Semaphore;
use tracing::warn;

use super::error::CacheError;
use crate::coord::TileKey;

/// Default number of tile downloads allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Who asked for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// A visible tile requested by the frame renderer.
    Render,
    /// A neighbouring tile warmed ahead of panning.
    Prefetch,
}

/// Bookkeeping for one outstanding fetch.
#[derive(Debug, Clone)]
pub struct FetchState {
    pub key: TileKey,
    pub origin: FetchOrigin,
    pub started_at: Instant,
}

/// Set of tiles with a fetch in progress.
///
/// At most one fetch per key exists at a time: [`try_begin`](Self::try_begin)
/// is an atomic check-and-insert.
#[derive(Debug, Default)]
pub struct InFlightFetches {
    fetches: DashMap<TileKey, FetchState>,
}

impl InFlightFetches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as being fetched. Returns `false` if it already was.
    pub fn try_begin(&self, key: TileKey, origin: FetchOrigin) -> bool {
        match self.fetches.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(FetchState {
                    key,
                    origin,
                    started_at: Instant::now(),
                });
                true
            }
        }
    }

    /// Clears the marker for `key`.
    pub fn finish(&self, key: &TileKey) -> Option<FetchState> {
        self.fetches.remove(key).map(|(_, state)| state)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.fetches.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fetches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
    }

    /// Snapshot of the outstanding fetches.
    pub fn snapshot(&self) -> Vec<FetchState> {
        self.fetches.iter().map(|e| e.value().clone()).collect()
    }
}

/// Bounded pool running blocking tile jobs on a tokio runtime.
///
/// Each job waits for one of `max_concurrent` permits, then runs on the
/// runtime's blocking thread pool. Jobs submitted after the runtime shut
/// down are dropped without running.
#[derive(Debug, Clone)]
pub struct FetchPool {
    handle: Handle,
    permits: Arc<Semaphore>,
}

impl FetchPool {
    pub fn new(handle: Handle, max_concurrent: usize) -> Self {
        Self {
            handle,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Queues a blocking job.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(e) = tokio::task::spawn_blocking(job).await {
                warn!(error = %e, "Tile worker job failed");
            }
        });
    }

    /// Permits not currently held by a running job.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Runtime owned by a cache that was built outside any tokio context.
///
/// Dropping it shuts the runtime down without waiting for queued jobs.
pub(crate) struct OwnedRuntime(Option<Runtime>);

impl OwnedRuntime {
    pub(crate) fn start(worker_threads: usize) -> Result<Self, CacheError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("fieldmap-tiles")
            .enable_all()
            .build()
            .map_err(|e| CacheError::Runtime(e.to_string()))?;
        Ok(Self(Some(runtime)))
    }

    pub(crate) fn handle(&self) -> Option<Handle> {
        self.0.as_ref().map(|rt| rt.handle().clone())
    }
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_try_begin_is_exclusive() {
        let fetches = InFlightFetches::new();
        let key = TileKey::new(10, 1, 2);

        assert!(fetches.try_begin(key, FetchOrigin::Render));
        assert!(!fetches.try_begin(key, FetchOrigin::Prefetch));
        assert_eq!(fetches.len(), 1);

        let state = fetches.finish(&key).unwrap();
        assert_eq!(state.origin, FetchOrigin::Render);
        assert!(fetches.is_empty());
        assert!(fetches.try_begin(key, FetchOrigin::Prefetch));
    }

    #[test]
    fn test_concurrent_try_begin_admits_one() {
        let fetches = Arc::new(InFlightFetches::new());
        let key = TileKey::new(12, 7, 7);
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let fetches = Arc::clone(&fetches);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if fetches.try_begin(key, FetchOrigin::Render) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_limits_concurrency() {
        let pool = FetchPool::new(Handle::current(), 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            pool.spawn(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        for _ in 0..200 {
            if done.load(Ordering::SeqCst) == 6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(done.load(Ordering::SeqCst), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2, "Pool exceeded its permits");
    }
}
