//! Owned raster figure with page-normalised layout.
//!
//! Layout rectangles are given in page coordinates (0 to 1, origin at the
//! bottom-left like a printed page) and converted to pixels when drawing.
//! A figure is a plain value: dropping it releases everything it holds.

use diags_common::{DiagsError, DiagsResult};
use serde::Serialize;
use tiny_skia::{
    ColorU8, IntRect, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform,
};
use tracing::debug;

use crate::text::{self, HAlign, TextStyle, VAlign};

pub const BLACK: [u8; 4] = [0, 0, 0, 255];
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Line height as a multiple of font size for multi-line text.
const LINE_SPACING: f32 = 1.25;

/// A rectangle in page coordinates: `x`, `y` of the lower-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PageRect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Grow (or shrink, with negative values) each side by a page-unit border.
    pub fn with_border(&self, border: Border) -> Self {
        let left = self.x + border.left;
        let bottom = self.y + border.bottom;
        let right = self.x + self.w + border.right;
        let top = self.y + self.h + border.top;
        Self::new(left, bottom, right - left, top - bottom)
    }
}

/// Page-unit offsets applied to (left, bottom, right, top) of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// A rectangle in pixel coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    /// Largest rectangle with `height / width == ratio` centred inside `self`.
    pub fn fit_ratio(&self, ratio: f32) -> PixelRect {
        let (w, h) = (self.width(), self.height());
        let (fw, fh) = if w * ratio <= h {
            (w, w * ratio)
        } else {
            (h / ratio, h)
        };
        let left = self.left + (w - fw) / 2.0;
        let top = self.top + (h - fh) / 2.0;
        PixelRect {
            left,
            top,
            right: left + fw,
            bottom: top + fh,
        }
    }

    fn to_rect(self) -> Option<Rect> {
        Rect::from_ltrb(self.left, self.top, self.right, self.bottom)
    }
}

/// Stroke style for polylines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: [u8; 4],
    pub width: f32,
}

impl LineStyle {
    pub fn solid(color: [u8; 4], width: f32) -> Self {
        Self { color, width }
    }
}

/// A raster figure sized `figsize` inches at `dpi`.
#[derive(Clone)]
pub struct Figure {
    pixmap: Pixmap,
    dpi: f32,
}

impl std::fmt::Debug for Figure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Figure")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl Figure {
    /// Create a white figure of `figsize` inches (width, height) at `dpi`.
    pub fn new(figsize: [f64; 2], dpi: f64) -> DiagsResult<Self> {
        if !(dpi > 0.0) || figsize.iter().any(|s| !(*s > 0.0)) {
            return Err(DiagsError::invalid_parameter(
                "figsize",
                format!("figure size {:?} at {} dpi is not positive", figsize, dpi),
            ));
        }
        let width = (figsize[0] * dpi).round() as u32;
        let height = (figsize[1] * dpi).round() as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            DiagsError::RenderError(format!("cannot allocate a {}x{} figure", width, height))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        debug!(width, height, dpi, "Created figure");

        Ok(Self {
            pixmap,
            dpi: dpi as f32,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Font size in points to pixels.
    pub fn points(&self, pt: f32) -> f32 {
        pt * self.dpi / 72.0
    }

    /// Page coordinates to pixel coordinates.
    pub fn page_point(&self, x: f64, y: f64) -> (f32, f32) {
        (
            (x * self.width() as f64) as f32,
            ((1.0 - y) * self.height() as f64) as f32,
        )
    }

    pub fn to_pixels(&self, rect: PageRect) -> PixelRect {
        let (left, bottom) = self.page_point(rect.x, rect.y);
        let (right, top) = self.page_point(rect.x + rect.w, rect.y + rect.h);
        PixelRect {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Demultiplied color of a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Demultiplied RGBA bytes, row-major.
    pub fn rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for p in self.pixmap.pixels() {
            let c = p.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// Run `draw` over an RGB copy of the page, then write the result back
    /// as opaque pixels.
    pub fn with_rgb<R, F>(&mut self, draw: F) -> DiagsResult<R>
    where
        F: FnOnce(&mut [u8], (u32, u32)) -> DiagsResult<R>,
    {
        let size = (self.width(), self.height());
        let mut rgb: Vec<u8> = Vec::with_capacity(self.pixmap.pixels().len() * 3);
        for p in self.pixmap.pixels() {
            let c = p.demultiply();
            rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
        }

        let result = draw(&mut rgb, size)?;

        for (px, c) in self.pixmap.pixels_mut().iter_mut().zip(rgb.chunks_exact(3)) {
            *px = ColorU8::from_rgba(c[0], c[1], c[2], 255).premultiply();
        }
        Ok(result)
    }

    /// Write opaque colors straight into the pixel buffer.
    ///
    /// `color_at(x, y)` is called for every pixel inside `rect`; `None`
    /// leaves the pixel untouched.
    pub fn fill_pixels<F>(&mut self, rect: PixelRect, mut color_at: F)
    where
        F: FnMut(u32, u32) -> Option<[u8; 3]>,
    {
        let width = self.width();
        let height = self.height();
        let x0 = rect.left.max(0.0).round() as u32;
        let y0 = rect.top.max(0.0).round() as u32;
        let x1 = (rect.right.round().max(0.0) as u32).min(width);
        let y1 = (rect.bottom.round().max(0.0) as u32).min(height);

        let pixels = self.pixmap.pixels_mut();
        for y in y0..y1 {
            for x in x0..x1 {
                if let Some([r, g, b]) = color_at(x, y) {
                    pixels[(y * width + x) as usize] =
                        ColorU8::from_rgba(r, g, b, 255).premultiply();
                }
            }
        }
    }

    pub fn fill_rect(&mut self, rect: PixelRect, color: [u8; 4]) {
        let Some(r) = rect.to_rect() else {
            return;
        };
        let paint = solid_paint(color, false);
        self.pixmap.fill_rect(r, &paint, Transform::identity(), None);
    }

    pub fn stroke_rect(&mut self, rect: PixelRect, color: [u8; 4], width: f32) {
        let Some(r) = rect.to_rect() else {
            return;
        };
        let path = PathBuilder::from_rect(r);
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &solid_paint(color, true), &stroke, Transform::identity(), None);
    }

    /// Stroke a polyline. Fewer than two points draws nothing.
    pub fn polyline(&mut self, points: &[(f32, f32)], style: &LineStyle) {
        if points.len() < 2 {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].0, points[0].1);
        for &(x, y) in &points[1..] {
            pb.line_to(x, y);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let stroke = Stroke {
            width: style.width,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &solid_paint(style.color, true),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    /// Draw text at pixel coordinates. Newlines start a new line below.
    pub fn text(&mut self, x: f32, y: f32, content: &str, style: &TextStyle) {
        let line_height = style.size * LINE_SPACING;
        for (i, line) in content.lines().enumerate() {
            text::draw_text(&mut self.pixmap, x, y + i as f32 * line_height, line, style);
        }
    }

    /// Draw text at page coordinates with a font size in points.
    pub fn page_text(&mut self, x: f64, y: f64, content: &str, size_pt: f32, halign: HAlign) {
        let (px, py) = self.page_point(x, y);
        let style = TextStyle::new(self.points(size_pt)).align(halign, VAlign::Top);
        self.text(px, py, content, &style);
    }

    /// Centred figure title at page height `y`, 15 pt.
    pub fn suptitle(&mut self, title: &str, y: f64) {
        let (px, py) = self.page_point(0.5, y);
        let style = TextStyle::new(self.points(15.0)).align(HAlign::Center, VAlign::Center);
        self.text(px, py, title, &style);
    }

    /// Copy the part of the figure inside `rect` (page coordinates).
    ///
    /// The rectangle is clipped to the page; an empty intersection is an error.
    pub fn crop(&self, rect: PageRect) -> DiagsResult<Figure> {
        let px = self.to_pixels(rect);
        let left = px.left.max(0.0).floor() as i32;
        let top = px.top.max(0.0).floor() as i32;
        let right = (px.right.ceil() as i32).min(self.width() as i32);
        let bottom = (px.bottom.ceil() as i32).min(self.height() as i32);

        let crop_error = || {
            DiagsError::RenderError(format!("crop rectangle {:?} lies outside the figure", rect))
        };
        if right <= left || bottom <= top {
            return Err(crop_error());
        }
        let int_rect = IntRect::from_xywh(left, top, (right - left) as u32, (bottom - top) as u32)
            .ok_or_else(crop_error)?;
        let pixmap = self.pixmap.clone_rect(int_rect).ok_or_else(crop_error)?;

        Ok(Figure {
            pixmap,
            dpi: self.dpi,
        })
    }
}

fn solid_paint(color: [u8; 4], anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = anti_alias;
    paint
}
