//! The rectangle of tiles needed to cover the screen.

use crate::coord::{
    lat_to_screen, lon_to_screen, tile_key_for_point, GeoPoint, PixelResolution, TileKey,
    TILE_SIZE,
};

/// A tile together with the screen position of its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub key: TileKey,
    pub x: f64,
    pub y: f64,
}

/// Tiles covering a screen, laid out around the center tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileWindow {
    /// Tile under the screen center.
    pub center: TileKey,
    /// Screen position of the center tile's top-left corner.
    pub origin: (f64, f64),
    /// Degrees per pixel, from the center tile's span.
    pub resolution: PixelResolution,
    pub cols_left: u32,
    pub cols_right: u32,
    pub rows_up: u32,
    pub rows_down: u32,
}

impl TileWindow {
    /// Lays out the tiles for a view.
    ///
    /// The center tile is positioned from its geographic bounds. Further
    /// columns and rows are added on each side until the overflow between
    /// the center tile and the screen edge is covered, but never more than
    /// one world's worth per side. Longitudes outside `[-180, 180)` are
    /// wrapped first.
    ///
    /// # Arguments
    ///
    /// * `center` - Geographic point shown at the screen center
    /// * `zoom` - Zoom level
    /// * `width` - Screen width in pixels
    /// * `height` - Screen height in pixels
    pub fn compute(center: &GeoPoint, zoom: u8, width: u32, height: u32) -> Self {
        let center = center.wrapped();
        let key = tile_key_for_point(&center, zoom);
        let bounds = key.bounds();
        let resolution = PixelResolution::from_tile_bounds(&bounds);
        let (w, h) = (width as f64, height as f64);
        let limit = TileKey::tiles_per_axis(zoom);

        let left = lon_to_screen(w, bounds.west, center.lon, resolution.lon);
        let top = lat_to_screen(h, bounds.north, center.lat, resolution.lat);
        let right = left + TILE_SIZE as f64;
        let bottom = top + TILE_SIZE as f64;

        Self {
            center: key,
            origin: (left, top),
            resolution,
            cols_left: tiles_to_cover(left, limit),
            cols_right: tiles_to_cover(w - right, limit),
            rows_up: tiles_to_cover(top, limit),
            rows_down: tiles_to_cover(h - bottom, limit),
        }
    }

    /// Number of columns in the window.
    pub fn columns(&self) -> u32 {
        self.cols_left + 1 + self.cols_right
    }

    /// Number of rows in the window.
    pub fn rows(&self) -> u32 {
        self.rows_up + 1 + self.rows_down
    }

    /// Every tile of the window with its screen position, row by row.
    ///
    /// Columns wrap around the antimeridian. Rows beyond the poles are left
    /// out.
    pub fn tiles(&self) -> Vec<PlacedTile> {
        let mut tiles = Vec::with_capacity((self.columns() * self.rows()) as usize);
        let size = TILE_SIZE as f64;
        for dy in -(self.rows_up as i64)..=self.rows_down as i64 {
            for dx in -(self.cols_left as i64)..=self.cols_right as i64 {
                if let Some(key) = self.center.offset(dx, dy) {
                    tiles.push(PlacedTile {
                        key,
                        x: self.origin.0 + dx as f64 * size,
                        y: self.origin.1 + dy as f64 * size,
                    });
                }
            }
        }
        tiles
    }

    /// Tiles one step outside the window, to warm before the user pans.
    pub fn ring(&self) -> Vec<TileKey> {
        let (left, right) = (-(self.cols_left as i64) - 1, self.cols_right as i64 + 1);
        let (up, down) = (-(self.rows_up as i64) - 1, self.rows_down as i64 + 1);
        let mut keys = Vec::new();
        for dy in up..=down {
            for dx in left..=right {
                let on_edge = dx == left || dx == right || dy == up || dy == down;
                if !on_edge {
                    continue;
                }
                if let Some(key) = self.center.offset(dx, dy) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }
        keys
    }
}

fn tiles_to_cover(overflow: f64, limit: u32) -> u32 {
    if overflow <= 0.0 {
        0
    } else {
        ((overflow / TILE_SIZE as f64).ceil() as u32).min(limit)
    }
}
