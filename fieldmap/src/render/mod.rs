//! Frame rendering.
//!
//! - [`TileWindow`]: which tiles cover the screen and where they go
//! - [`Canvas`] / [`PixmapCanvas`]: the drawing surface
//! - [`OverlaySource`] / [`OverlayCache`]: external overlay geometry
//! - [`FrameRenderer`]: draws one frame from a viewport and a tile cache

mod canvas;
mod frame;
mod overlay;
mod window;

use std::path::PathBuf;

use thiserror::Error;

pub use canvas::{Canvas, Label, PixmapCanvas, Rgba, StrokeStyle};
pub use frame::{format_distance, FrameReport, FrameRenderer, RenderOptions, LABEL_MIN_ZOOM};
pub use overlay::{
    LayerVisibility, OverlayCache, OverlayError, OverlayFeature, OverlayGeometry, OverlayKind,
    OverlayQuery, OverlaySource, OverlayStyle,
};
pub use window::{PlacedTile, TileWindow};

/// Errors creating or exporting a drawing surface.
///
/// Drawing itself never fails.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid canvas size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Failed to write frame to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
