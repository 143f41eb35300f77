//! Tile cache counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated from the render thread and tile workers.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    fetches_started: AtomicU64,
    fetches_deduplicated: AtomicU64,
    fetches_completed: AtomicU64,
    fetches_failed: AtomicU64,
    evictions: AtomicU64,
    corrupt_disk_entries: AtomicU64,
}

macro_rules! counter {
    ($name:ident, $field:ident) => {
        pub(crate) fn $name(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl CacheCounters {
    counter!(record_memory_hit, memory_hits);
    counter!(record_disk_hit, disk_hits);
    counter!(record_miss, misses);
    counter!(record_fetch_started, fetches_started);
    counter!(record_fetch_deduplicated, fetches_deduplicated);
    counter!(record_fetch_completed, fetches_completed);
    counter!(record_fetch_failed, fetches_failed);
    counter!(record_evictions, evictions);
    counter!(record_corrupt_disk_entry, corrupt_disk_entries);

    pub(crate) fn snapshot(
        &self,
        memory_entries: usize,
        memory_bytes: usize,
        in_flight: usize,
    ) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches_started: self.fetches_started.load(Ordering::Relaxed),
            fetches_deduplicated: self.fetches_deduplicated.load(Ordering::Relaxed),
            fetches_completed: self.fetches_completed.load(Ordering::Relaxed),
            fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            corrupt_disk_entries: self.corrupt_disk_entries.load(Ordering::Relaxed),
            memory_entries,
            memory_bytes,
            in_flight,
        }
    }
}

/// Point-in-time view of cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    /// Lookups answered with the placeholder while offline.
    pub misses: u64,
    pub fetches_started: u64,
    /// Lookups that found a fetch for the same tile already running.
    pub fetches_deduplicated: u64,
    pub fetches_completed: u64,
    pub fetches_failed: u64,
    pub evictions: u64,
    pub corrupt_disk_entries: u64,
    pub memory_entries: usize,
    pub memory_bytes: usize,
    pub in_flight: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from memory or disk.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.disk_hits;
        let total = hits + self.misses + self.fetches_started + self.fetches_deduplicated;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory {} tiles, hits {} mem / {} disk, fetches {} started / {} done / {} failed, {} in flight",
            self.memory_entries,
            self.memory_hits,
            self.disk_hits,
            self.fetches_started,
            self.fetches_completed,
            self.fetches_failed,
            self.in_flight
        )
    }
}
