//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! Web Mercator slippy-tile indices and screen pixels. Everything here is pure
//! and deterministic; invalid input such as NaN is not rejected, it simply
//! produces a meaningless result.

mod types;

pub use types::{
    Axis, GeoBounds, GeoPoint, PixelResolution, TileKey, EARTH_RADIUS_M, MAX_LAT, MAX_ZOOM,
    MIN_LAT, MIN_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Returns the `(x, y)` index of the tile containing a point.
///
/// Uses the standard slippy-map formula. Indices are clamped into
/// `0..2^zoom`, so a point on the antimeridian at +180° or beyond the
/// Mercator limits maps to the edge tile.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees
/// * `lon` - Longitude in degrees
/// * `zoom` - Zoom level
#[inline]
pub fn tile_index_for_point(lat: f64, lon: f64, zoom: u8) -> (u32, u32) {
    let n = TileKey::tiles_per_axis(zoom) as f64;

    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    (clamp_index(x, n), clamp_index(y, n))
}

/// Returns the key of the tile containing a point.
#[inline]
pub fn tile_key_for_point(point: &GeoPoint, zoom: u8) -> TileKey {
    let (x, y) = tile_index_for_point(point.lat, point.lon, zoom);
    TileKey::new(zoom, x, y)
}

// NaN stays NaN through clamp and saturates to 0 on the cast.
fn clamp_index(value: f64, n: f64) -> u32 {
    value.clamp(0.0, n - 1.0) as u32
}

/// Geographic edges of a tile.
///
/// This is the inverse of [`tile_index_for_point`]: every point inside the
/// returned bounds maps back to `(x, y)`.
pub fn tile_bounds(x: u32, y: u32, zoom: u8) -> GeoBounds {
    GeoBounds {
        north: tile_row_to_lat(y as f64, zoom),
        south: tile_row_to_lat(y as f64 + 1.0, zoom),
        west: tile_col_to_lon(x as f64, zoom),
        east: tile_col_to_lon(x as f64 + 1.0, zoom),
    }
}

fn tile_col_to_lon(x: f64, zoom: u8) -> f64 {
    x / TileKey::tiles_per_axis(zoom) as f64 * 360.0 - 180.0
}

fn tile_row_to_lat(y: f64, zoom: u8) -> f64 {
    let n = TileKey::tiles_per_axis(zoom) as f64;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    lat_rad.to_degrees()
}

/// Maps a world coordinate onto a screen axis.
///
/// The center coordinate lands in the middle of the axis. Vertically,
/// `screen = dim/2 - (world - center) / resolution`; horizontally the sign is
/// flipped.
///
/// # Arguments
///
/// * `axis` - Which screen axis the coordinate belongs to
/// * `dim` - Screen extent along that axis in pixels
/// * `world` - Coordinate to project (degrees)
/// * `center` - Coordinate shown at the middle of the axis (degrees)
/// * `resolution` - Degrees per pixel along that axis
#[inline]
pub fn world_to_screen(axis: Axis, dim: f64, world: f64, center: f64, resolution: f64) -> f64 {
    let offset = (world - center) / resolution;
    match axis {
        Axis::Vertical => dim / 2.0 - offset,
        Axis::Horizontal => dim / 2.0 + offset,
    }
}

/// Inverse of [`world_to_screen`].
#[inline]
pub fn screen_to_world(axis: Axis, dim: f64, screen: f64, center: f64, resolution: f64) -> f64 {
    match axis {
        Axis::Vertical => center + (dim / 2.0 - screen) * resolution,
        Axis::Horizontal => center + (screen - dim / 2.0) * resolution,
    }
}

/// Screen row of a latitude.
#[inline]
pub fn lat_to_screen(height: f64, lat: f64, center_lat: f64, resolution: f64) -> f64 {
    world_to_screen(Axis::Vertical, height, lat, center_lat, resolution)
}

/// Latitude shown at a screen row.
#[inline]
pub fn screen_to_lat(height: f64, screen_y: f64, center_lat: f64, resolution: f64) -> f64 {
    screen_to_world(Axis::Vertical, height, screen_y, center_lat, resolution)
}

/// Screen column of a longitude.
#[inline]
pub fn lon_to_screen(width: f64, lon: f64, center_lon: f64, resolution: f64) -> f64 {
    world_to_screen(Axis::Horizontal, width, lon, center_lon, resolution)
}

/// Longitude shown at a screen column.
#[inline]
pub fn screen_to_lon(width: f64, screen_x: f64, center_lon: f64, resolution: f64) -> f64 {
    screen_to_world(Axis::Horizontal, width, screen_x, center_lon, resolution)
}

/// Degrees of longitude spanned by one pixel at a zoom level.
pub fn pixel_resolution_for_zoom(zoom: u8) -> f64 {
    360.0 / TileKey::tiles_per_axis(zoom) as f64 / TILE_SIZE as f64
}

/// Great-circle distance between two points in meters (haversine).
pub fn great_circle_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
