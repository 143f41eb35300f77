//! Map viewport: what part of the world is on screen.
//!
//! The viewport owns the center, zoom and screen size, the measurement state
//! machine and the transient markers. Every change fires the shared
//! [`RepaintSignal`]. Changes that move the visible area also bump the
//! [`epoch`](Viewport::epoch), which overlay caches use to decide when to
//! re-query their sources. GPS updates repaint without bumping the epoch.

mod gesture;
mod measure;
mod state;

pub use gesture::{
    GestureAction, GestureTracker, TouchEvent, TouchPhase, DOUBLE_TAP_WINDOW, JITTER_THRESHOLD_PX,
};
pub use measure::{MeasureMode, MeasurementResult, MeasurementSession};
pub use state::{StateError, ViewportState};

use tracing::debug;

use crate::coord::{
    lat_to_screen, lon_to_screen, screen_to_lat, screen_to_lon, tile_key_for_point, GeoBounds,
    GeoPoint, PixelResolution, TileKey, MAX_ZOOM, MIN_ZOOM,
};
use crate::signal::RepaintSignal;

/// Default map center (Bolzano, South Tyrol).
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(46.674056, 11.132294);

/// Default zoom level.
pub const DEFAULT_ZOOM: u8 = 16;

/// Clamps any integer zoom request into the supported range.
pub fn clamp_zoom(level: i32) -> u8 {
    level.clamp(MIN_ZOOM as i32, MAX_ZOOM as i32) as u8
}

/// The visible map area and its interaction state.
#[derive(Debug)]
pub struct Viewport {
    center: GeoPoint,
    zoom: u8,
    width: u32,
    height: u32,
    goto_marker: Option<GeoPoint>,
    gps_position: Option<GeoPoint>,
    gesture_active: bool,
    measure: MeasureMode,
    epoch: u64,
    signal: RepaintSignal,
}

impl Viewport {
    /// Creates a viewport. Out-of-range zoom is clamped.
    ///
    /// # Arguments
    ///
    /// * `center` - Initial map center
    /// * `zoom` - Initial zoom level
    /// * `width` - Screen width in pixels
    /// * `height` - Screen height in pixels
    /// * `signal` - Repaint signal shared with the render loop
    pub fn new(center: GeoPoint, zoom: i32, width: u32, height: u32, signal: RepaintSignal) -> Self {
        Self {
            center,
            zoom: clamp_zoom(zoom),
            width,
            height,
            goto_marker: None,
            gps_position: None,
            gesture_active: false,
            measure: MeasureMode::Idle,
            epoch: 0,
            signal,
        }
    }

    /// Restores a viewport from persisted state.
    pub fn from_state(state: &ViewportState, width: u32, height: u32, signal: RepaintSignal) -> Self {
        Self::new(
            GeoPoint::new(state.lat, state.lon),
            state.zoom as i32,
            width,
            height,
            signal,
        )
    }

    /// Center and zoom for persistence.
    pub fn state(&self) -> ViewportState {
        ViewportState {
            lon: self.center.lon,
            lat: self.center.lat,
            zoom: self.zoom,
        }
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Key of the tile under the screen center.
    pub fn center_tile(&self) -> TileKey {
        tile_key_for_point(&self.center, self.zoom)
    }

    /// Degrees per pixel, derived from the span of the center tile.
    pub fn resolution(&self) -> PixelResolution {
        PixelResolution::from_tile_bounds(&self.center_tile().bounds())
    }

    /// Geographic area covered by the screen.
    pub fn bounds(&self) -> GeoBounds {
        let res = self.resolution();
        let (w, h) = (self.width as f64, self.height as f64);
        GeoBounds {
            north: screen_to_lat(h, 0.0, self.center.lat, res.lat),
            south: screen_to_lat(h, h, self.center.lat, res.lat),
            west: screen_to_lon(w, 0.0, self.center.lon, res.lon),
            east: screen_to_lon(w, w, self.center.lon, res.lon),
        }
    }

    /// World coordinate under a screen position.
    pub fn screen_to_world(&self, x: f64, y: f64) -> GeoPoint {
        let res = self.resolution();
        GeoPoint::new(
            screen_to_lat(self.height as f64, y, self.center.lat, res.lat),
            screen_to_lon(self.width as f64, x, self.center.lon, res.lon),
        )
    }

    /// Screen position of a world coordinate.
    pub fn world_to_screen(&self, point: &GeoPoint) -> (f64, f64) {
        let res = self.resolution();
        (
            lon_to_screen(self.width as f64, point.lon, self.center.lon, res.lon),
            lat_to_screen(self.height as f64, point.lat, self.center.lat, res.lat),
        )
    }

    /// Counter bumped by every change of the visible area.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn repaint_signal(&self) -> &RepaintSignal {
        &self.signal
    }

    fn moved(&mut self) {
        self.epoch += 1;
        self.signal.invalidate();
    }

    /// Shifts the map by a finger movement in pixels.
    ///
    /// Dragging right moves the center west, dragging down moves it north.
    /// Coordinates are not clamped. Clears the goto marker.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let res = self.resolution();
        self.center.lon -= dx * res.lon;
        self.center.lat += dy * res.lat;
        self.goto_marker = None;
        self.moved();
    }

    pub fn zoom_in(&mut self) {
        self.zoom_to(self.zoom as i32 + 1);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_to(self.zoom as i32 - 1);
    }

    /// Sets the zoom level, clamped to the supported range.
    pub fn zoom_to(&mut self, level: i32) {
        let zoom = clamp_zoom(level);
        if zoom as i32 != level {
            debug!(requested = level, zoom, "Zoom clamped");
        }
        self.zoom = zoom;
        self.moved();
    }

    /// Recenters on a coordinate and shows the goto marker there.
    pub fn goto_coordinate(&mut self, lat: f64, lon: f64) {
        let target = GeoPoint::new(lat, lon);
        self.center = target;
        self.goto_marker = Some(target);
        self.moved();
    }

    pub fn goto_marker(&self) -> Option<GeoPoint> {
        self.goto_marker
    }

    /// Updates the screen size in pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.moved();
    }

    /// Moves the current-position marker. Overlays are not refreshed.
    pub fn update_gps_position(&mut self, position: GeoPoint) {
        self.gps_position = Some(position);
        self.signal.invalidate();
    }

    pub fn gps_position(&self) -> Option<GeoPoint> {
        self.gps_position
    }

    /// Recenters on the last GPS fix. Returns `false` without one.
    pub fn center_on_gps(&mut self) -> bool {
        let Some(position) = self.gps_position else {
            return false;
        };
        self.center = position;
        self.moved();
        true
    }

    /// Marks a pan or zoom gesture as in progress.
    ///
    /// Ending a gesture repaints so overlays come back.
    pub fn set_gesture_active(&mut self, active: bool) {
        if self.gesture_active == active {
            return;
        }
        self.gesture_active = active;
        if !active {
            self.signal.invalidate();
        }
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// Switches between panning and measuring.
    ///
    /// Enabling starts an empty session. Disabling drops any session in
    /// progress without reporting it.
    pub fn set_measure_mode(&mut self, enabled: bool) {
        self.measure = if enabled {
            MeasureMode::Measuring(MeasurementSession::new())
        } else {
            MeasureMode::Idle
        };
        self.signal.invalidate();
    }

    pub fn is_measuring(&self) -> bool {
        self.measure.is_measuring()
    }

    pub fn measure_mode(&self) -> &MeasureMode {
        &self.measure
    }

    /// Adds the world point under a screen position to the measurement.
    ///
    /// Returns the length of the new segment, or `None` when idle.
    pub fn measure_drag_to(&mut self, x: f64, y: f64) -> Option<f64> {
        let point = self.screen_to_world(x, y);
        let segment = self.measure.session_mut()?.add_point(point);
        self.signal.invalidate();
        Some(segment)
    }

    /// Ends a measuring drag, returning the collected path.
    ///
    /// The session stays active and empty, ready for the next drag.
    pub fn measure_release(&mut self) -> Option<MeasurementResult> {
        let result = self.measure.session_mut()?.finish();
        if result.is_some() {
            self.signal.invalidate();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::great_circle_distance;

    fn viewport() -> Viewport {
        Viewport::new(DEFAULT_CENTER, DEFAULT_ZOOM as i32, 800, 600, RepaintSignal::new())
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = viewport();
        vp.zoom_to(-5);
        assert_eq!(vp.zoom(), 0);
        vp.zoom_to(99);
        assert_eq!(vp.zoom(), 18);
        vp.zoom_in();
        assert_eq!(vp.zoom(), 18);
        vp.zoom_to(0);
        vp.zoom_out();
        assert_eq!(vp.zoom(), 0);
    }

    #[test]
    fn test_constructor_clamps_zoom() {
        let vp = Viewport::new(DEFAULT_CENTER, 40, 10, 10, RepaintSignal::new());
        assert_eq!(vp.zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_pan_direction() {
        let mut vp = viewport();
        let before = vp.center();
        let res = vp.resolution();

        vp.pan(10.0, 20.0);

        let after = vp.center();
        assert!((after.lon - (before.lon - 10.0 * res.lon)).abs() < 1e-12, "Drag right moves west");
        assert!((after.lat - (before.lat + 20.0 * res.lat)).abs() < 1e-12, "Drag down moves north");
    }

    #[test]
    fn test_pan_keeps_dragged_point_under_finger() {
        let mut vp = viewport();
        let grabbed = vp.screen_to_world(300.0, 200.0);

        vp.pan(15.0, -7.0);
        let (x, y) = vp.world_to_screen(&grabbed);

        // Resolution may change when the center crosses a tile row, keep it loose
        assert!((x - 315.0).abs() < 0.01, "x = {}", x);
        assert!((y - 193.0).abs() < 0.01, "y = {}", y);
    }

    #[test]
    fn test_changes_bump_epoch_and_signal() {
        let mut vp = viewport();
        let signal = vp.repaint_signal().clone();

        vp.pan(1.0, 1.0);
        assert_eq!(vp.epoch(), 1);
        assert!(signal.take());

        vp.zoom_in();
        vp.goto_coordinate(0.0, 0.0);
        vp.resize(1024, 768);
        assert_eq!(vp.epoch(), 4);
    }

    #[test]
    fn test_gps_update_repaints_without_epoch() {
        let mut vp = viewport();
        let signal = vp.repaint_signal().clone();

        vp.update_gps_position(GeoPoint::new(46.0, 11.0));

        assert_eq!(vp.epoch(), 0, "GPS updates must not refresh overlays");
        assert!(signal.take());
        assert!(vp.center_on_gps());
        assert_eq!(vp.center(), GeoPoint::new(46.0, 11.0));
        assert_eq!(vp.epoch(), 1);
    }

    #[test]
    fn test_center_on_gps_without_fix() {
        let mut vp = viewport();
        assert!(!vp.center_on_gps());
        assert_eq!(vp.center(), DEFAULT_CENTER);
    }

    #[test]
    fn test_goto_sets_marker_until_next_pan() {
        let mut vp = viewport();
        vp.goto_coordinate(45.0, 10.0);
        assert_eq!(vp.center(), GeoPoint::new(45.0, 10.0));
        assert_eq!(vp.goto_marker(), Some(GeoPoint::new(45.0, 10.0)));

        vp.zoom_in();
        assert!(vp.goto_marker().is_some(), "Zoom keeps the marker");
        vp.pan(1.0, 0.0);
        assert!(vp.goto_marker().is_none());
    }

    #[test]
    fn test_resolution_derives_from_center_tile() {
        let vp = viewport();
        let bounds = vp.center_tile().bounds();
        let res = vp.resolution();
        assert_eq!(res.lon, bounds.lon_span() / 256.0);
        assert_eq!(res.lat, bounds.lat_span() / 256.0);
    }

    #[test]
    fn test_bounds_contain_center() {
        let vp = viewport();
        let bounds = vp.bounds();
        assert!(bounds.contains(&vp.center()));
        assert!(bounds.north > bounds.south);
        assert!(bounds.east > bounds.west);
    }

    #[test]
    fn test_measurement_state_machine() {
        let mut vp = viewport();
        assert_eq!(vp.measure_drag_to(10.0, 10.0), None, "Idle drags do not measure");

        vp.set_measure_mode(true);
        let zoom = vp.zoom();
        vp.pan(5.0, 5.0);
        vp.zoom_to(zoom as i32 - 1);
        assert!(vp.is_measuring(), "Pan and zoom never leave measure mode");

        vp.measure_drag_to(100.0, 100.0);
        vp.measure_drag_to(150.0, 100.0);
        let points = vp.measure_mode().session().unwrap().points().to_vec();
        let result = vp.measure_release().unwrap();

        assert_eq!(result.points, points);
        assert!(
            (result.total_distance_meters - great_circle_distance(&points[0], &points[1])).abs()
                < 1e-9
        );
        assert!(vp.is_measuring());
        assert!(vp.measure_release().is_none(), "Result is emitted once");
    }

    #[test]
    fn test_disabling_measure_discards_session() {
        let mut vp = viewport();
        vp.set_measure_mode(true);
        vp.measure_drag_to(1.0, 1.0);
        vp.set_measure_mode(false);

        assert!(!vp.is_measuring());
        assert!(vp.measure_release().is_none());
    }

    #[test]
    fn test_gesture_end_repaints() {
        let mut vp = viewport();
        let signal = vp.repaint_signal().clone();
        vp.set_gesture_active(true);
        assert!(vp.gesture_active());
        signal.take();

        vp.set_gesture_active(false);
        assert!(signal.take());
    }

    #[test]
    fn test_state_round_trip() {
        let mut vp = viewport();
        vp.goto_coordinate(40.0, -74.0);
        vp.zoom_to(12);
        let state = vp.state();

        let restored = Viewport::from_state(&state, 320, 240, RepaintSignal::new());
        assert_eq!(restored.center(), GeoPoint::new(40.0, -74.0));
        assert_eq!(restored.zoom(), 12);
    }
}
