//! One frame of the map.
//!
//! A frame lays out the tile window around the center tile, draws whatever
//! the tile cache has for each slot, composites overlays unless a gesture is
//! running, and finishes with the markers. Nothing in here fails: missing
//! tiles leave gaps and failing overlays are skipped until the next frame.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::canvas::{Canvas, Label, Rgba, StrokeStyle};
use super::overlay::{
    LayerVisibility, OverlayCache, OverlayFeature, OverlayGeometry, OverlayQuery, OverlaySource,
};
use super::window::TileWindow;
use crate::cache::TileCache;
use crate::coord::{lat_to_screen, lon_to_screen, GeoPoint, PixelResolution, TileKey, TILE_SIZE};
use crate::viewport::Viewport;

/// Labels are drawn only above this zoom level.
pub const LABEL_MIN_ZOOM: u8 = 12;

const TILE_FRAME: StrokeStyle = StrokeStyle::new([255, 0, 255, 160], 1.0);
const CROSSHAIR: StrokeStyle = StrokeStyle::new([0, 0, 0, 200], 1.5);
const GOTO_MARKER: StrokeStyle = StrokeStyle::new([220, 0, 0, 255], 3.0);
const MEASURE_PATH: StrokeStyle = StrokeStyle::new([255, 140, 0, 255], 3.0);
const GPS_HALO: Rgba = [255, 255, 255, 255];
const GPS_DOT: Rgba = [0, 90, 255, 255];
const LABEL_COLOR: Rgba = [0, 0, 0, 255];

/// Frame settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Colour behind the tiles, visible through gaps.
    pub background: Rgba,
    /// Outline every tile and label it with `/z/x/y`.
    pub show_tile_frames: bool,
    /// Warm the ring of tiles around the window when the view moves.
    pub prefetch: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: [238, 238, 238, 255],
            show_tile_frames: false,
            prefetch: true,
        }
    }
}

impl RenderOptions {
    pub fn with_tile_frames(mut self, show: bool) -> Self {
        self.show_tile_frames = show;
        self
    }

    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }
}

/// What a frame did.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub window: TileWindow,
    /// Tiles drawn from the cache.
    pub tiles_drawn: usize,
    /// Slots that got the placeholder.
    pub placeholders: usize,
    /// Overlay sources composited.
    pub overlays_drawn: usize,
    /// Overlay sources skipped after a failed query.
    pub overlays_failed: usize,
    /// Whether overlays were left out because a gesture was running.
    pub overlays_suppressed: bool,
    /// Tiles handed to the cache for warming.
    pub prefetched: usize,
}

/// Maps world points to screen pixels for one frame.
#[derive(Debug, Clone, Copy)]
struct Projection {
    width: f64,
    height: f64,
    center: GeoPoint,
    resolution: PixelResolution,
}

impl Projection {
    fn apply(&self, point: &GeoPoint) -> (f64, f64) {
        (
            lon_to_screen(self.width, point.lon, self.center.lon, self.resolution.lon),
            lat_to_screen(self.height, point.lat, self.center.lat, self.resolution.lat),
        )
    }

    /// Projects a path, dropping points that land on the previous pixel.
    fn path(&self, points: &[GeoPoint]) -> Vec<(f64, f64)> {
        let mut screen: Vec<(f64, f64)> = Vec::with_capacity(points.len());
        let mut last_pixel: Option<(i64, i64)> = None;
        for point in points {
            let (x, y) = self.apply(point);
            let pixel = (x.round() as i64, y.round() as i64);
            if last_pixel == Some(pixel) {
                continue;
            }
            last_pixel = Some(pixel);
            screen.push((x, y));
        }
        screen
    }
}

/// Renders frames and keeps the state that spans frames.
#[derive(Default)]
pub struct FrameRenderer {
    options: RenderOptions,
    overlays: OverlayCache,
    last_prefetch: Option<(TileKey, u32, u32, u32, u32)>,
}

impl FrameRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            overlays: OverlayCache::new(),
            last_prefetch: None,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_show_tile_frames(&mut self, show: bool) {
        self.options.show_tile_frames = show;
    }

    /// Drops cached overlay answers so every source is queried again.
    pub fn invalidate_overlays(&mut self) {
        self.overlays.clear();
    }

    /// Draws one frame.
    ///
    /// # Arguments
    ///
    /// * `canvas` - Target surface, sized like the viewport
    /// * `viewport` - Current view
    /// * `cache` - Tile cache to draw from
    /// * `sources` - Overlay sources in drawing order
    /// * `visibility` - Which overlay categories to draw
    pub fn render(
        &mut self,
        canvas: &mut dyn Canvas,
        viewport: &Viewport,
        cache: &TileCache,
        sources: &[Arc<dyn OverlaySource>],
        visibility: &LayerVisibility,
    ) -> FrameReport {
        let started = Instant::now();
        let center = viewport.center();
        let zoom = viewport.zoom();
        let (width, height) = (viewport.width(), viewport.height());

        canvas.clear(self.options.background);

        let window = TileWindow::compute(&center, zoom, width, height);
        let projection = Projection {
            width: width as f64,
            height: height as f64,
            center: center.wrapped(),
            resolution: window.resolution,
        };

        let mut report = FrameReport {
            window: window.clone(),
            tiles_drawn: 0,
            placeholders: 0,
            overlays_drawn: 0,
            overlays_failed: 0,
            overlays_suppressed: false,
            prefetched: 0,
        };

        self.draw_tiles(canvas, cache, &window, &mut report);
        self.schedule_prefetch(cache, &window, &mut report);

        if viewport.gesture_active() {
            report.overlays_suppressed = true;
        } else {
            let query = OverlayQuery {
                bounds: viewport.bounds(),
                width,
                height,
                center,
                resolution: window.resolution,
                zoom,
            };
            for source in sources {
                if !visibility.is_visible(source.kind()) {
                    continue;
                }
                match self
                    .overlays
                    .features(source.as_ref(), viewport.epoch(), &query)
                {
                    Some(features) => {
                        for feature in features.iter() {
                            draw_feature(canvas, feature, &projection, zoom);
                        }
                        report.overlays_drawn += 1;
                    }
                    None => report.overlays_failed += 1,
                }
            }
        }

        draw_markers(canvas, viewport, &projection);

        debug!(
            zoom,
            center_tile = %window.center,
            tiles = report.tiles_drawn,
            placeholders = report.placeholders,
            overlays = report.overlays_drawn,
            elapsed_us = started.elapsed().as_micros() as u64,
            "Frame rendered"
        );
        report
    }

    fn draw_tiles(
        &self,
        canvas: &mut dyn Canvas,
        cache: &TileCache,
        window: &TileWindow,
        report: &mut FrameReport,
    ) {
        let size = TILE_SIZE as f64;
        for placed in window.tiles() {
            let image = cache.get(placed.key);
            if cache.is_placeholder(&image) {
                report.placeholders += 1;
            } else {
                report.tiles_drawn += 1;
            }
            canvas.draw_tile(&image, placed.x, placed.y);

            if self.options.show_tile_frames {
                canvas.stroke_rect(placed.x, placed.y, size, size, &TILE_FRAME);
                canvas.draw_label(Label {
                    text: format!("/{}", placed.key),
                    x: placed.x + 4.0,
                    y: placed.y + 14.0,
                    color: TILE_FRAME.color,
                });
            }
        }
    }

    fn schedule_prefetch(&mut self, cache: &TileCache, window: &TileWindow, report: &mut FrameReport) {
        if !self.options.prefetch {
            return;
        }
        let id = (
            window.center,
            window.cols_left,
            window.cols_right,
            window.rows_up,
            window.rows_down,
        );
        if self.last_prefetch == Some(id) {
            return;
        }
        self.last_prefetch = Some(id);
        let ring = window.ring();
        report.prefetched = ring.len();
        cache.prefetch(ring);
    }
}

fn draw_feature(canvas: &mut dyn Canvas, feature: &OverlayFeature, projection: &Projection, zoom: u8) {
    let style = StrokeStyle::new(feature.style.stroke, feature.style.width);
    let points = feature.geometry.points();

    match &feature.geometry {
        OverlayGeometry::Points(_) => {
            for point in points {
                canvas.fill_circle(projection.apply(point), feature.style.point_radius, feature.style.stroke);
            }
        }
        OverlayGeometry::Line(_) => {
            canvas.stroke_polyline(&projection.path(points), &style);
        }
        OverlayGeometry::Polygon(_) => {
            let fill = feature.style.fill.unwrap_or([0, 0, 0, 0]);
            canvas.fill_polygon(&projection.path(points), fill, &style);
        }
    }

    if zoom > LABEL_MIN_ZOOM && !feature.labels.is_empty() && feature.labels.len() == points.len() {
        for (point, text) in points.iter().zip(&feature.labels) {
            let (x, y) = projection.apply(point);
            canvas.draw_label(Label {
                text: text.clone(),
                x: x + 6.0,
                y: y - 6.0,
                color: LABEL_COLOR,
            });
        }
    }
}

fn draw_markers(canvas: &mut dyn Canvas, viewport: &Viewport, projection: &Projection) {
    if let Some(position) = viewport.gps_position() {
        let at = projection.apply(&position);
        canvas.fill_circle(at, 8.0, GPS_HALO);
        canvas.fill_circle(at, 6.0, GPS_DOT);
    }

    if let Some(target) = viewport.goto_marker() {
        let (x, y) = projection.apply(&target);
        canvas.stroke_polyline(&[(x - 10.0, y - 10.0), (x + 10.0, y + 10.0)], &GOTO_MARKER);
        canvas.stroke_polyline(&[(x - 10.0, y + 10.0), (x + 10.0, y - 10.0)], &GOTO_MARKER);
    }

    let (cx, cy) = (projection.width / 2.0, projection.height / 2.0);
    canvas.stroke_polyline(&[(cx - 12.0, cy), (cx + 12.0, cy)], &CROSSHAIR);
    canvas.stroke_polyline(&[(cx, cy - 12.0), (cx, cy + 12.0)], &CROSSHAIR);

    if let Some(session) = viewport.measure_mode().session() {
        let path = projection.path(session.points());
        canvas.stroke_polyline(&path, &MEASURE_PATH);
        if let Some(&(x, y)) = path.last() {
            canvas.draw_label(Label {
                text: format_distance(session.cumulative_distance()),
                x: x + 8.0,
                y: y - 8.0,
                color: MEASURE_PATH.color,
            });
        }
    }
}

/// Human readable distance: meters below one kilometer, kilometers above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.1} m", meters)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}
