//! Core provider trait and error type.

use thiserror::Error;

use crate::coord::{TileKey, MAX_ZOOM, MIN_ZOOM};

/// Errors raised while downloading a tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport failure, timeout or non-success HTTP status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider does not serve this zoom level.
    #[error("Unsupported zoom level: {0}")]
    UnsupportedZoom(u8),

    /// The tile URL template is malformed.
    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),
}

/// A network source of raster tiles.
///
/// Implementations perform blocking I/O and are always called from the tile
/// cache's worker pool, never from the render path.
pub trait Provider: Send + Sync {
    /// Downloads the encoded image bytes of one tile.
    fn download_tile(&self, key: &TileKey) -> Result<Vec<u8>, ProviderError>;

    /// Human-readable provider name for logs.
    fn name(&self) -> &str;

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }

    /// Whether the provider serves tiles at this zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        (self.min_zoom()..=self.max_zoom()).contains(&zoom)
    }
}
