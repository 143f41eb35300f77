//! Three-tier tile cache: memory, disk, network.
//!
//! [`TileCache::get`] never blocks on the network. It answers from memory,
//! then from disk, and otherwise starts at most one background fetch per
//! tile and returns the placeholder. When a fetch lands, the tile is written
//! to disk, inserted into memory, its in-flight marker is cleared and the
//! repaint signal fires, in that order. The next frame then finds the tile
//! in memory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::disk::{disk_cache_stats, DiskTier, DiskUsage, DEFAULT_TILE_EXTENSION};
use super::error::CacheError;
use super::fetch::{
    FetchOrigin, FetchPool, FetchState, InFlightFetches, OwnedRuntime,
    DEFAULT_MAX_CONCURRENT_FETCHES,
};
use super::image::TileImage;
use super::memory::{MemoryTier, DEFAULT_MAX_MEMORY_TILES};
use super::stats::{CacheCounters, CacheStats};
use crate::coord::TileKey;
use crate::provider::Provider;
use crate::signal::RepaintSignal;

/// Tile cache settings.
#[derive(Debug, Clone)]
pub struct TileCacheConfig {
    /// Root of the disk tier.
    pub cache_dir: PathBuf,
    /// File extension of cached tiles.
    pub extension: String,
    /// Capacity of the memory tier in tiles.
    pub max_memory_tiles: usize,
    /// Upper bound on simultaneous downloads.
    pub max_concurrent_fetches: usize,
    /// Whether misses may go to the network.
    pub network_enabled: bool,
}

impl TileCacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            extension: DEFAULT_TILE_EXTENSION.to_string(),
            max_memory_tiles: DEFAULT_MAX_MEMORY_TILES,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            network_enabled: true,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_max_memory_tiles(mut self, tiles: usize) -> Self {
        self.max_memory_tiles = tiles;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, fetches: usize) -> Self {
        self.max_concurrent_fetches = fetches;
        self
    }

    pub fn with_network_enabled(mut self, enabled: bool) -> Self {
        self.network_enabled = enabled;
        self
    }
}

/// Builder for [`TileCache`].
pub struct TileCacheBuilder {
    config: TileCacheConfig,
    provider: Arc<dyn Provider>,
    placeholder: Option<TileImage>,
    signal: Option<RepaintSignal>,
    handle: Option<Handle>,
}

impl TileCacheBuilder {
    /// Image returned for tiles that are not available yet.
    ///
    /// Defaults to [`TileImage::empty`], which leaves a gap when drawn.
    pub fn placeholder(mut self, image: TileImage) -> Self {
        self.placeholder = Some(image);
        self
    }

    /// Signal fired whenever a fetched tile becomes available.
    pub fn repaint_signal(mut self, signal: RepaintSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Runtime whose blocking pool runs the downloads.
    ///
    /// Without one the current runtime is used, and outside any runtime the
    /// cache starts its own.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn build(self) -> Result<TileCache, CacheError> {
        let max_concurrent = self.config.max_concurrent_fetches.max(1);
        let (handle, runtime) = match self.handle.or_else(|| Handle::try_current().ok()) {
            Some(handle) => (handle, None),
            None => {
                let runtime = OwnedRuntime::start(max_concurrent)?;
                let handle = runtime
                    .handle()
                    .ok_or_else(|| CacheError::Runtime("runtime missing".to_string()))?;
                (handle, Some(Arc::new(runtime)))
            }
        };

        info!(
            cache_dir = %self.config.cache_dir.display(),
            provider = self.provider.name(),
            max_memory_tiles = self.config.max_memory_tiles,
            max_concurrent,
            network = self.config.network_enabled,
            "Tile cache initialized"
        );

        let inner = CacheInner {
            memory: Mutex::new(MemoryTier::new(self.config.max_memory_tiles)),
            disk: DiskTier::new(&self.config.cache_dir, self.config.extension.clone()),
            in_flight: InFlightFetches::new(),
            provider: self.provider,
            placeholder: self.placeholder.unwrap_or_else(TileImage::empty),
            signal: self.signal.unwrap_or_default(),
            network_enabled: AtomicBool::new(self.config.network_enabled),
            counters: CacheCounters::default(),
            pool: FetchPool::new(handle, max_concurrent),
        };

        Ok(TileCache {
            inner: Arc::new(inner),
            _runtime: runtime,
        })
    }
}

struct CacheInner {
    memory: Mutex<MemoryTier>,
    disk: DiskTier,
    in_flight: InFlightFetches,
    provider: Arc<dyn Provider>,
    placeholder: TileImage,
    signal: RepaintSignal,
    network_enabled: AtomicBool,
    counters: CacheCounters,
    pool: FetchPool,
}

/// Cloneable handle to a shared tile cache.
#[derive(Clone)]
pub struct TileCache {
    inner: Arc<CacheInner>,
    _runtime: Option<Arc<OwnedRuntime>>,
}

impl TileCache {
    pub fn builder(config: TileCacheConfig, provider: Arc<dyn Provider>) -> TileCacheBuilder {
        TileCacheBuilder {
            config,
            provider,
            placeholder: None,
            signal: None,
            handle: None,
        }
    }

    /// Returns the tile's image, or the placeholder while it is unavailable.
    ///
    /// Memory hits return the cached surface. Disk hits are decoded, stored in
    /// memory and returned. Otherwise, if networking is enabled and no fetch
    /// for this tile is running, a background fetch starts. Failures are
    /// logged and never surface here.
    pub fn get(&self, key: TileKey) -> TileImage {
        self.inner.lookup(key, FetchOrigin::Render)
    }

    /// Warms the given tiles off the calling thread.
    ///
    /// Tiles already in memory are skipped. The rest go through the same
    /// disk-then-network path as [`get`](Self::get).
    pub fn prefetch(&self, keys: impl IntoIterator<Item = TileKey>) {
        let keys: Vec<TileKey> = keys.into_iter().collect();
        if keys.is_empty() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        self.inner.pool.spawn(move || {
            for key in keys {
                if !inner.memory.lock().contains(&key) {
                    inner.lookup(key, FetchOrigin::Prefetch);
                }
            }
        });
    }

    /// Releases every surface in the memory tier and empties it.
    ///
    /// The disk tier is untouched. Fetches already running keep their
    /// markers and still insert their tile when they finish.
    pub fn clear(&self) {
        let released = self.inner.memory.lock().clear();
        info!(released, "Cleared tile memory cache");
    }

    /// Whether `image` is this cache's placeholder.
    pub fn is_placeholder(&self, image: &TileImage) -> bool {
        image.same_surface(&self.inner.placeholder)
    }

    pub fn placeholder(&self) -> &TileImage {
        &self.inner.placeholder
    }

    pub fn set_network_enabled(&self, enabled: bool) {
        self.inner.network_enabled.store(enabled, Ordering::Relaxed);
        info!(enabled, "Tile network access changed");
    }

    pub fn network_enabled(&self) -> bool {
        self.inner.network_enabled.load(Ordering::Relaxed)
    }

    pub fn repaint_signal(&self) -> &RepaintSignal {
        &self.inner.signal
    }

    pub fn contains_in_memory(&self, key: &TileKey) -> bool {
        self.inner.memory.lock().contains(key)
    }

    /// Memory-resident keys, oldest first.
    pub fn memory_keys(&self) -> Vec<TileKey> {
        self.inner.memory.lock().keys_in_order()
    }

    pub fn is_fetching(&self, key: &TileKey) -> bool {
        self.inner.in_flight.contains(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn in_flight(&self) -> Vec<FetchState> {
        self.inner.in_flight.snapshot()
    }

    pub fn disk(&self) -> &DiskTier {
        &self.inner.disk
    }

    /// Files and bytes in the disk tier.
    pub fn disk_usage(&self) -> Result<DiskUsage, CacheError> {
        let root = self.inner.disk.root();
        disk_cache_stats(root).map_err(|source| CacheError::Io {
            path: root.to_path_buf(),
            source,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider.name()
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, bytes) = {
            let memory = self.inner.memory.lock();
            (memory.len(), memory.size_bytes())
        };
        self.inner
            .counters
            .snapshot(entries, bytes, self.inner.in_flight.len())
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("provider", &self.inner.provider.name())
            .field("disk", &self.inner.disk)
            .field("network_enabled", &self.network_enabled())
            .finish()
    }
}

impl CacheInner {
    fn lookup(self: &Arc<Self>, key: TileKey, origin: FetchOrigin) -> TileImage {
        if let Some(image) = self.memory.lock().get(&key) {
            self.counters.record_memory_hit(1);
            return image;
        }

        if let Some(image) = self.load_from_disk(&key) {
            return image;
        }

        if !self.network_enabled.load(Ordering::Relaxed) {
            self.counters.record_miss(1);
            return self.placeholder.clone();
        }

        if !self.in_flight.try_begin(key, origin) {
            self.counters.record_fetch_deduplicated(1);
            return self.placeholder.clone();
        }

        // A fetch may have landed between the memory check and the marker
        if let Some(image) = self.memory.lock().get(&key) {
            self.in_flight.finish(&key);
            self.counters.record_memory_hit(1);
            return image;
        }

        self.counters.record_fetch_started(1);
        debug!(tile = %key, ?origin, "Starting tile fetch");
        let guard = InFlightGuard {
            inner: Arc::clone(self),
            key,
        };
        self.pool.spawn(move || Self::run_fetch(guard));

        self.placeholder.clone()
    }

    fn load_from_disk(&self, key: &TileKey) -> Option<TileImage> {
        let decoded = self
            .disk
            .read(key)
            .and_then(|bytes| bytes.map(|b| TileImage::decode(&b)).transpose());

        match decoded {
            Ok(Some(image)) => {
                self.counters.record_disk_hit(1);
                Some(self.insert_memory(*key, image))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(tile = %key, error = %e, "Discarding unreadable disk cache entry");
                self.counters.record_corrupt_disk_entry(1);
                if let Err(e) = self.disk.remove(key) {
                    warn!(tile = %key, error = %e, "Failed to delete disk cache entry");
                }
                None
            }
        }
    }

    /// Stores a decoded tile unless one is already resident, and returns
    /// the surface that is.
    fn insert_memory(&self, key: TileKey, image: TileImage) -> TileImage {
        let (held, evicted) = self.memory.lock().get_or_insert(key, image);
        if !evicted.is_empty() {
            self.counters.record_evictions(evicted.len() as u64);
        }
        held
    }

    fn run_fetch(guard: InFlightGuard) {
        let inner = Arc::clone(&guard.inner);
        let key = guard.key;

        let fetched = inner
            .provider
            .download_tile(&key)
            .map_err(CacheError::from)
            .and_then(|bytes| TileImage::decode(&bytes).map(|image| (bytes, image)));

        match fetched {
            Ok((bytes, image)) => {
                if let Err(e) = inner.disk.write(&key, &bytes) {
                    warn!(tile = %key, error = %e, "Failed to persist tile");
                }
                inner.insert_memory(key, image);
                drop(guard);
                inner.counters.record_fetch_completed(1);
                debug!(tile = %key, bytes = bytes.len(), "Tile fetch completed");
                inner.signal.invalidate();
            }
            Err(e) => {
                drop(guard);
                inner.counters.record_fetch_failed(1);
                warn!(tile = %key, error = %e, "Tile fetch failed");
            }
        }
    }
}

/// Clears a tile's in-flight marker when dropped, including when the job
/// is discarded without running.
struct InFlightGuard {
    inner: Arc<CacheInner>,
    key: TileKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.finish(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::image::tests::png_bytes;
    use crate::cache::testing::CountingProvider;
    use crate::provider::ProviderError;
    use std::sync::Barrier;
    use std::time::Duration;
    use tempfile::TempDir;

    const KEY: TileKey = TileKey::new(16, 34816, 22912);

    fn build(dir: &TempDir, provider: Arc<CountingProvider>, network: bool) -> TileCache {
        TileCache::builder(
            TileCacheConfig::new(dir.path()).with_network_enabled(network),
            provider,
        )
        .placeholder(TileImage::solid(1, 1, [200, 200, 200, 255]).unwrap())
        .runtime(Handle::current())
        .build()
        .unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Condition not met in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_offline_miss_returns_placeholder_without_disk_write() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, Arc::clone(&provider), false);

        let image = cache.get(KEY);

        assert!(cache.is_placeholder(&image));
        assert!(image.same_surface(cache.placeholder()));
        assert!(!cache.disk().tile_path(&KEY).exists());
        assert_eq!(provider.calls(), 0);
        assert_eq!(cache.in_flight_count(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_memory_hit_returns_same_surface() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, provider, false);
        cache.disk().write(&KEY, &png_bytes([1, 2, 3, 255])).unwrap();

        let first = cache.get(KEY);
        let second = cache.get(KEY);

        assert!(!cache.is_placeholder(&first));
        assert!(first.same_surface(&second));
        let stats = cache.stats();
        assert_eq!(stats.disk_hits, 1);
        assert_eq!(stats.memory_hits, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disk_hit_does_not_fetch() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, Arc::clone(&provider), true);
        cache.disk().write(&KEY, &png_bytes([9, 9, 9, 255])).unwrap();

        let image = cache.get(KEY);

        assert!(!cache.is_placeholder(&image));
        assert!(cache.contains_in_memory(&KEY));
        assert_eq!(provider.calls(), 0);
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_corrupt_disk_entry_is_deleted() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, provider, false);
        cache.disk().write(&KEY, b"truncated garbage").unwrap();

        let image = cache.get(KEY);

        assert!(cache.is_placeholder(&image));
        assert!(!cache.disk().tile_path(&KEY).exists());
        assert_eq!(cache.stats().corrupt_disk_entries, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_gets_share_one_fetch() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 255, 0, 255])));
        let cache = build(&dir, Arc::clone(&provider), true);

        let gate = provider.close_gate();
        let first = cache.get(KEY);
        let second = cache.get(KEY);

        assert!(cache.is_placeholder(&first));
        assert!(cache.is_placeholder(&second));
        assert!(cache.is_fetching(&KEY));
        assert_eq!(cache.in_flight_count(), 1);
        assert_eq!(cache.stats().fetches_deduplicated, 1);
        drop(gate);

        assert!(
            cache
                .repaint_signal()
                .wait_timeout(Duration::from_secs(5))
                .await,
            "Completed fetch should signal a repaint"
        );
        assert!(!cache.is_fetching(&KEY));

        let image = cache.get(KEY);
        assert!(!cache.is_placeholder(&image));
        assert!(cache.disk().tile_path(&KEY).exists());
        assert_eq!(provider.calls(), 1, "Exactly one download per tile");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_fetch_clears_marker_and_does_not_retry() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::err(ProviderError::HttpError(
            "HTTP 404".to_string(),
        )));
        let cache = build(&dir, Arc::clone(&provider), true);

        let image = cache.get(KEY);
        assert!(cache.is_placeholder(&image));
        wait_until(|| cache.stats().fetches_failed == 1).await;

        assert_eq!(cache.in_flight_count(), 0);
        assert_eq!(provider.calls(), 1);
        assert!(!cache.repaint_signal().is_pending());
        assert!(!cache.disk().tile_path(&KEY).exists());

        // A later lookup is free to try again
        cache.get(KEY);
        wait_until(|| cache.stats().fetches_failed == 2).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_undecodable_download_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(b"<html>rate limited</html>".to_vec()));
        let cache = build(&dir, provider, true);

        cache.get(KEY);
        wait_until(|| cache.stats().fetches_failed == 1).await;

        assert!(!cache.disk().tile_path(&KEY).exists());
        assert!(!cache.contains_in_memory(&KEY));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_releases_memory_but_keeps_disk() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, Arc::clone(&provider), false);
        cache.disk().write(&KEY, &png_bytes([5, 5, 5, 255])).unwrap();

        let image = cache.get(KEY);
        cache.clear();

        assert!(image.is_released());
        assert!(cache.memory_keys().is_empty());

        let reloaded = cache.get(KEY);
        assert!(!reloaded.is_released());
        assert!(!reloaded.same_surface(&image));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_keeps_in_flight_markers() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, Arc::clone(&provider), true);

        let gate = provider.close_gate();
        cache.get(KEY);
        cache.clear();
        cache.get(KEY);
        assert_eq!(cache.in_flight_count(), 1);
        drop(gate);

        wait_until(|| cache.contains_in_memory(&KEY)).await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_memory_never_exceeds_capacity_under_concurrency() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, provider, false);
        for x in 0..40 {
            cache
                .disk()
                .write(&TileKey::new(10, x, 0), &png_bytes([x as u8, 0, 0, 255]))
                .unwrap();
        }

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..40u32 {
                        cache.get(TileKey::new(10, (i + t * 10) % 40, 0));
                        assert!(cache.memory_keys().len() <= DEFAULT_MAX_MEMORY_TILES);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(cache.memory_keys().len(), DEFAULT_MAX_MEMORY_TILES);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_disk_hits_hand_out_live_surfaces() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, provider, false);
        cache.disk().write(&KEY, &png_bytes([4, 5, 6, 255])).unwrap();

        for round in 0..200 {
            let barrier = Barrier::new(2);
            let (a, b) = std::thread::scope(|s| {
                let first = s.spawn(|| {
                    barrier.wait();
                    cache.get(KEY)
                });
                let second = s.spawn(|| {
                    barrier.wait();
                    cache.get(KEY)
                });
                (first.join().unwrap(), second.join().unwrap())
            });

            assert!(
                !a.is_released() && !b.is_released(),
                "Round {} handed out a released surface",
                round
            );
            assert!(a.same_surface(&b), "Round {} kept two surfaces", round);
            assert_eq!(cache.memory_keys(), vec![KEY]);
            cache.clear();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_during_completing_fetch_share_one_surface() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 255, 0, 255])));
        let cache = build(&dir, Arc::clone(&provider), true);

        let gate = provider.close_gate();
        assert!(cache.is_placeholder(&cache.get(KEY)));

        let reader = {
            let cache = cache.clone();
            tokio::task::spawn_blocking(move || {
                let deadline = std::time::Instant::now() + Duration::from_secs(5);
                let mut seen = Vec::new();
                while seen.len() < 50 && std::time::Instant::now() < deadline {
                    let image = cache.get(KEY);
                    if cache.is_placeholder(&image) {
                        std::thread::yield_now();
                    } else {
                        seen.push(image);
                    }
                }
                seen
            })
        };
        drop(gate);
        let seen = reader.await.unwrap();
        wait_until(|| cache.in_flight_count() == 0).await;

        let resident = cache.get(KEY);
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|image| !image.is_released()));
        assert!(seen.iter().all(|image| image.same_surface(&resident)));
        assert_eq!(cache.memory_keys(), vec![KEY]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_prefetch_warms_memory_from_disk() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, Arc::clone(&provider), false);
        let keys = [TileKey::new(4, 1, 1), TileKey::new(4, 2, 1)];
        for key in &keys {
            cache.disk().write(key, &png_bytes([7, 7, 7, 255])).unwrap();
        }

        cache.prefetch(keys);
        wait_until(|| keys.iter().all(|k| cache.contains_in_memory(k))).await;

        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_network_toggle() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = build(&dir, Arc::clone(&provider), false);

        cache.get(KEY);
        assert_eq!(provider.calls(), 0);

        cache.set_network_enabled(true);
        cache.get(KEY);
        wait_until(|| cache.contains_in_memory(&KEY)).await;
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_builds_own_runtime_outside_tokio() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::ok(png_bytes([0, 0, 255, 255])));
        let cache = TileCache::builder(TileCacheConfig::new(dir.path()), provider)
            .build()
            .unwrap();

        cache.get(KEY);
        for _ in 0..500 {
            if cache.contains_in_memory(&KEY) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(cache.contains_in_memory(&KEY));
    }
}
