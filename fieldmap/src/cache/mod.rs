//! Tile caching.
//!
//! Tiles flow through three tiers:
//!
//! - **Memory**: a small FIFO of decoded surfaces ([`MemoryTier`])
//! - **Disk**: encoded tiles under `<root>/<zoom>/<x>/<y>.<ext>` ([`DiskTier`])
//! - **Network**: a [`Provider`](crate::provider::Provider) polled by a bounded worker pool
//!
//! [`TileCache`] stitches them together and deduplicates concurrent fetches
//! of the same tile.

mod disk;
mod error;
mod fetch;
mod image;
mod memory;
mod stats;
mod tile_cache;

#[cfg(test)]
pub(crate) mod testing;

pub use disk::{
    clear_disk_cache, disk_cache_stats, ClearResult, DiskTier, DiskUsage, DEFAULT_TILE_EXTENSION,
};
pub use error::CacheError;
pub use fetch::{
    FetchOrigin, FetchPool, FetchState, InFlightFetches, DEFAULT_MAX_CONCURRENT_FETCHES,
};
pub use image::TileImage;
pub use memory::{MemoryTier, DEFAULT_MAX_MEMORY_TILES};
pub use stats::CacheStats;
pub use tile_cache::{TileCache, TileCacheBuilder, TileCacheConfig};

#[cfg(test)]
pub(crate) use image::tests::png_bytes;
