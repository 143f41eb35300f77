//! Tile cache errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors raised inside the tile cache.
///
/// None of these reach [`TileCache::get`](super::TileCache::get) callers: a
/// failure on any tier degrades to the placeholder and is logged.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Encoded image could not be decoded.
    #[error("Failed to decode tile image: {0}")]
    Decode(String),

    /// Network source failed.
    #[error("Tile download failed: {0}")]
    Provider(#[from] ProviderError),

    /// Disk tier I/O failure.
    #[error("Disk cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker runtime could not be created.
    #[error("Failed to start tile workers: {0}")]
    Runtime(String),
}
