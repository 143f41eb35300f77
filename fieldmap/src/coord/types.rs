//! Value types shared by the coordinate math, the tile cache and the renderer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Edge length of a raster tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Lowest zoom level of the pyramid (one tile covers the world).
pub const MIN_ZOOM: u8 = 0;

/// Highest zoom level the viewport allows.
pub const MAX_ZOOM: u8 = 18;

/// Northern limit of the Web Mercator projection in degrees.
pub const MAX_LAT: f64 = 85.05112878;

/// Southern limit of the Web Mercator projection in degrees.
pub const MIN_LAT: f64 = -85.05112878;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Address of one raster tile in the slippy-map pyramid.
///
/// `x` grows eastwards from the antimeridian, `y` grows southwards from the
/// northern Mercator limit. Both range over `0..2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Creates a new tile key.
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Number of tiles along one axis at the given zoom level.
    #[inline]
    pub fn tiles_per_axis(zoom: u8) -> u32 {
        1u32 << zoom.min(31)
    }

    /// Geographic edges of this tile.
    pub fn bounds(&self) -> GeoBounds {
        super::tile_bounds(self.x, self.y, self.zoom)
    }

    /// Returns the neighbour `dx` columns and `dy` rows away.
    ///
    /// Columns wrap around the antimeridian. Rows beyond the poles do not
    /// exist and yield `None`.
    pub fn offset(&self, dx: i64, dy: i64) -> Option<TileKey> {
        let n = Self::tiles_per_axis(self.zoom) as i64;
        let y = self.y as i64 + dy;
        if !(0..n).contains(&y) {
            return None;
        }
        let x = (self.x as i64 + dx).rem_euclid(n);
        Some(TileKey::new(self.zoom, x as u32, y as u32))
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// The same point with its longitude brought into `[-180, 180)`.
    pub fn wrapped(&self) -> Self {
        Self {
            lat: self.lat,
            lon: (self.lon + 180.0).rem_euclid(360.0) - 180.0,
        }
    }
}

/// Axis-aligned geographic rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    /// Width of the rectangle in degrees of longitude.
    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the rectangle in degrees of latitude.
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Whether the point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat <= self.north
            && point.lat >= self.south
            && point.lon >= self.west
            && point.lon <= self.east
    }
}

/// World units (degrees) covered by one screen pixel along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelResolution {
    /// Degrees of longitude per horizontal pixel.
    pub lon: f64,
    /// Degrees of latitude per vertical pixel.
    pub lat: f64,
}

impl PixelResolution {
    /// Derives the resolution from the span of a rendered tile.
    pub fn from_tile_bounds(bounds: &GeoBounds) -> Self {
        Self {
            lon: bounds.lon_span() / TILE_SIZE as f64,
            lat: bounds.lat_span() / TILE_SIZE as f64,
        }
    }
}

/// Screen axis used by the linear world/screen transforms.
///
/// Pixel rows grow downwards while latitude grows upwards, so the vertical
/// axis flips sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}
