//! Overlay data sources and their per-view cache.
//!
//! Overlays (imported maps, GPS logs, notes, images) come from external
//! stores through [`OverlaySource`]. Sources return geometry already
//! decimated for the requested view. The renderer keeps the last answer per
//! source in an [`OverlayCache`] and only asks again when the visible area
//! changed.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::coord::{GeoBounds, GeoPoint, PixelResolution};

use super::canvas::Rgba;

/// Errors reported by overlay sources.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The backing store could not be reached.
    #[error("Overlay store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed the query.
    #[error("Overlay query failed: {0}")]
    Query(String),
}

/// Overlay categories, each switchable by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// Imported vector and raster maps.
    Maps,
    /// Recorded GPS logs.
    Logs,
    Notes,
    Images,
}

/// Which overlay categories are drawn.
///
/// Owned by the application shell and passed into each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    pub maps: bool,
    pub logs: bool,
    pub notes: bool,
    pub images: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            maps: true,
            logs: true,
            notes: true,
            images: true,
        }
    }
}

impl LayerVisibility {
    pub fn is_visible(&self, kind: OverlayKind) -> bool {
        match kind {
            OverlayKind::Maps => self.maps,
            OverlayKind::Logs => self.logs,
            OverlayKind::Notes => self.notes,
            OverlayKind::Images => self.images,
        }
    }

    pub fn set(&mut self, kind: OverlayKind, visible: bool) {
        match kind {
            OverlayKind::Maps => self.maps = visible,
            OverlayKind::Logs => self.logs = visible,
            OverlayKind::Notes => self.notes = visible,
            OverlayKind::Images => self.images = visible,
        }
    }
}

/// The view an overlay query is made for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayQuery {
    pub bounds: GeoBounds,
    pub width: u32,
    pub height: u32,
    pub center: GeoPoint,
    pub resolution: PixelResolution,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayGeometry {
    Points(Vec<GeoPoint>),
    Line(Vec<GeoPoint>),
    Polygon(Vec<GeoPoint>),
}

impl OverlayGeometry {
    pub fn points(&self) -> &[GeoPoint] {
        match self {
            OverlayGeometry::Points(p) | OverlayGeometry::Line(p) | OverlayGeometry::Polygon(p) => p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub stroke: Rgba,
    pub fill: Option<Rgba>,
    pub width: f32,
    pub point_radius: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke: [255, 0, 0, 255],
            fill: None,
            width: 2.0,
            point_radius: 4.0,
        }
    }
}

/// One decimated feature ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFeature {
    pub geometry: OverlayGeometry,
    /// Optional per-point labels. Drawn only when there is one per point.
    pub labels: Vec<String>,
    pub style: OverlayStyle,
}

impl OverlayFeature {
    pub fn new(geometry: OverlayGeometry) -> Self {
        Self {
            geometry,
            labels: Vec::new(),
            style: OverlayStyle::default(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }
}

/// External provider of overlay geometry.
///
/// Called on the render thread, so implementations must answer quickly or
/// cache on their own.
pub trait OverlaySource: Send + Sync {
    /// Stable identifier, unique among the session's sources.
    fn id(&self) -> &str;

    fn kind(&self) -> OverlayKind;

    /// Returns the features inside `query.bounds`, decimated for the view.
    fn query_in_bounds(&self, query: &OverlayQuery) -> Result<Vec<OverlayFeature>, OverlayError>;
}

struct CachedOverlay {
    epoch: u64,
    features: Arc<Vec<OverlayFeature>>,
}

/// Last successful answer of every overlay source.
#[derive(Default)]
pub struct OverlayCache {
    entries: HashMap<String, CachedOverlay>,
}

impl OverlayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Features of `source` for the view at `epoch`.
    ///
    /// Queries the source only if the cached answer is from another epoch.
    /// A failed query is logged and yields `None`; nothing is cached, so the
    /// next frame asks again.
    pub fn features(
        &mut self,
        source: &dyn OverlaySource,
        epoch: u64,
        query: &OverlayQuery,
    ) -> Option<Arc<Vec<OverlayFeature>>> {
        if let Some(cached) = self.entries.get(source.id()) {
            if cached.epoch == epoch {
                return Some(Arc::clone(&cached.features));
            }
        }

        match source.query_in_bounds(query) {
            Ok(features) => {
                debug!(source = source.id(), features = features.len(), epoch, "Overlay refreshed");
                let features = Arc::new(features);
                self.entries.insert(
                    source.id().to_string(),
                    CachedOverlay {
                        epoch,
                        features: Arc::clone(&features),
                    },
                );
                Some(features)
            }
            Err(e) => {
                warn!(source = source.id(), error = %e, "Skipping overlay for this frame");
                None
            }
        }
    }

    /// Epoch of the cached answer for a source.
    pub fn cached_epoch(&self, source_id: &str) -> Option<u64> {
        self.entries.get(source_id).map(|c| c.epoch)
    }

    /// Drops every cached answer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
