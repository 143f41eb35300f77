//! Decoded tile surfaces with explicit release.
//!
//! A [`TileImage`] is a cheap, cloneable handle to a premultiplied RGBA
//! surface. Clones share one surface. When the memory tier evicts a tile it
//! calls [`TileImage::release`], which frees the pixel buffer for every clone
//! at once instead of waiting for the last handle to drop.
//!
//! Release takes the surface's write lock, and drawing holds the read lock,
//! so a surface evicted while a frame is compositing it is freed only after
//! that draw completes. Any later draw of the released handle is a no-op.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tiny_skia::{Color, IntSize, Pixmap, PixmapRef};

use super::error::CacheError;

struct Surface {
    pixels: RwLock<Option<Pixmap>>,
    byte_size: usize,
}

/// Handle to a decoded raster tile.
#[derive(Clone)]
pub struct TileImage {
    surface: Arc<Surface>,
}

impl TileImage {
    /// Wraps an already decoded surface.
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        let byte_size = pixmap.data().len();
        Self {
            surface: Arc::new(Surface {
                pixels: RwLock::new(Some(pixmap)),
                byte_size,
            }),
        }
    }

    /// A surface with no pixels. Drawing it leaves a transparent gap.
    pub fn empty() -> Self {
        Self {
            surface: Arc::new(Surface {
                pixels: RwLock::new(None),
                byte_size: 0,
            }),
        }
    }

    /// A surface filled with one colour, typically used as a placeholder.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
        Some(Self::from_pixmap(pixmap))
    }

    /// Decodes an encoded raster image (PNG, JPEG, ...).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Decode`] for truncated, corrupt, empty or
    /// unsupported images.
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| CacheError::Decode(e.to_string()))?;
        let rgba = decoded.into_rgba8();
        let (width, height) = rgba.dimensions();
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| CacheError::Decode(format!("Invalid dimensions {}×{}", width, height)))?;

        let mut data = rgba.into_raw();
        premultiply(&mut data);

        let pixmap = Pixmap::from_vec(data, size)
            .ok_or_else(|| CacheError::Decode("Pixel buffer does not match size".to_string()))?;
        Ok(Self::from_pixmap(pixmap))
    }

    /// Size of the pixel buffer in bytes, as allocated at creation.
    pub fn byte_size(&self) -> usize {
        self.surface.byte_size
    }

    /// Width and height in pixels, or `None` for empty or released surfaces.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.surface
            .pixels
            .read()
            .as_ref()
            .map(|p| (p.width(), p.height()))
    }

    /// Whether the pixel buffer has been released.
    pub fn is_released(&self) -> bool {
        self.surface.pixels.read().is_none()
    }

    /// Frees the pixel buffer for every clone of this handle.
    ///
    /// Blocks until in-progress draws of this surface finish. Returns the
    /// number of bytes freed, zero if already released.
    pub fn release(&self) -> usize {
        match self.surface.pixels.write().take() {
            Some(pixmap) => pixmap.data().len(),
            None => 0,
        }
    }

    /// Runs `f` with read access to the pixels, if still present.
    pub fn with_pixmap<R>(&self, f: impl FnOnce(PixmapRef<'_>) -> R) -> Option<R> {
        let guard = self.surface.pixels.read();
        guard.as_ref().map(|pixmap| f(pixmap.as_ref()))
    }

    /// Whether both handles point at the same surface.
    pub fn same_surface(&self, other: &TileImage) -> bool {
        Arc::ptr_eq(&self.surface, &other.surface)
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileImage")
            .field("dimensions", &self.dimensions())
            .field("byte_size", &self.byte_size())
            .finish()
    }
}

// tiny-skia stores premultiplied alpha.
fn premultiply(rgba: &mut [u8]) {
    for pixel in rgba.chunks_exact_mut(4) {
        let alpha = pixel[3] as u16;
        if alpha == 255 {
            continue;
        }
        for channel in &mut pixel[..3] {
            *channel = ((*channel as u16 * alpha + 127) / 255) as u8;
        }
    }
}
