//! Drawing surface abstraction and a tiny-skia implementation.
//!
//! The frame renderer draws through [`Canvas`] so the application shell can
//! plug in its own surface. [`PixmapCanvas`] renders into an in-memory
//! `tiny_skia::Pixmap`, which the CLI writes out as PNG. Text is not
//! rasterized: labels are collected for the shell to draw with its own
//! fonts.

use std::path::Path;

use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};

use super::RenderError;
use crate::cache::TileImage;

/// Straight RGBA colour.
pub type Rgba = [u8; 4];

/// Line appearance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba,
    pub width: f32,
}

impl StrokeStyle {
    pub const fn new(color: Rgba, width: f32) -> Self {
        Self { color, width }
    }
}

/// Text to be drawn at a screen position.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: Rgba,
}

/// Target of one rendered frame.
pub trait Canvas {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fills the whole surface.
    fn clear(&mut self, color: Rgba);

    /// Draws a tile with its top-left corner at `(x, y)`.
    ///
    /// Released or empty images draw nothing.
    fn draw_tile(&mut self, image: &TileImage, x: f64, y: f64);

    /// Strokes a connected line through `points`.
    fn stroke_polyline(&mut self, points: &[(f64, f64)], style: &StrokeStyle);

    /// Fills a closed polygon and strokes its outline.
    fn fill_polygon(&mut self, points: &[(f64, f64)], fill: Rgba, outline: &StrokeStyle);

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: Rgba);

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, style: &StrokeStyle);

    fn draw_label(&mut self, label: Label);
}

/// Canvas backed by a tiny-skia pixmap.
pub struct PixmapCanvas {
    pixmap: Pixmap,
    labels: Vec<Label>,
}

impl PixmapCanvas {
    /// Creates a transparent canvas.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSize`] for zero or oversized dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;
        Ok(Self {
            pixmap,
            labels: Vec::new(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Labels drawn since the last [`clear`](Canvas::clear).
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Encodes the surface as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        self.pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }

    /// Writes the surface to a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn paint(color: Rgba) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        paint
    }

    fn stroke(width: f32) -> Stroke {
        Stroke {
            width,
            ..Stroke::default()
        }
    }
}

fn build_path(points: &[(f64, f64)], close: bool) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(first.0 as f32, first.1 as f32);
    for point in rest {
        builder.line_to(point.0 as f32, point.1 as f32);
    }
    if close {
        builder.close();
    }
    builder.finish()
}

impl Canvas for PixmapCanvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn clear(&mut self, color: Rgba) {
        self.pixmap
            .fill(Color::from_rgba8(color[0], color[1], color[2], color[3]));
        self.labels.clear();
    }

    fn draw_tile(&mut self, image: &TileImage, x: f64, y: f64) {
        let target = &mut self.pixmap;
        image.with_pixmap(|tile| {
            target.draw_pixmap(
                x.round() as i32,
                y.round() as i32,
                tile,
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        });
    }

    fn stroke_polyline(&mut self, points: &[(f64, f64)], style: &StrokeStyle) {
        if points.len() < 2 {
            return;
        }
        if let Some(path) = build_path(points, false) {
            self.pixmap.stroke_path(
                &path,
                &Self::paint(style.color),
                &Self::stroke(style.width),
                Transform::identity(),
                None,
            );
        }
    }

    fn fill_polygon(&mut self, points: &[(f64, f64)], fill: Rgba, outline: &StrokeStyle) {
        if points.len() < 3 {
            return;
        }
        if let Some(path) = build_path(points, true) {
            self.pixmap.fill_path(
                &path,
                &Self::paint(fill),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
            self.pixmap.stroke_path(
                &path,
                &Self::paint(outline.color),
                &Self::stroke(outline.width),
                Transform::identity(),
                None,
            );
        }
    }

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: Rgba) {
        if let Some(path) = PathBuilder::from_circle(center.0 as f32, center.1 as f32, radius as f32)
        {
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, style: &StrokeStyle) {
        let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        self.pixmap.stroke_path(
            &path,
            &Self::paint(style.color),
            &Self::stroke(style.width),
            Transform::identity(),
            None,
        );
    }

    fn draw_label(&mut self, label: Label) {
        self.labels.push(label);
    }
}
