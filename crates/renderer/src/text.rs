//! TrueType text drawing onto figure pixmaps.
//!
//! Each run is rasterized with `rusttype` into a transparent RGBA image,
//! then composited onto the figure so it can be anchored and rotated.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use once_cell::sync::Lazy;
use rusttype::{Font, Scale};
use tiny_skia::{FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};
use tracing::warn;

/// Embedded font data - DejaVu Sans
pub const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

static FONT: Lazy<Option<Font<'static>>> = Lazy::new(|| {
    let font = Font::try_from_bytes(FONT_DATA);
    if font.is_none() {
        warn!("Embedded font could not be parsed; text will not be drawn");
    }
    font
});

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Baseline,
}

/// How to draw a run of text.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Font size in pixels.
    pub size: f32,
    pub color: [u8; 4],
    pub halign: HAlign,
    pub valign: VAlign,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
}

impl TextStyle {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            color: [0, 0, 0, 255],
            halign: HAlign::Left,
            valign: VAlign::Baseline,
            rotation: 0.0,
        }
    }

    pub fn align(mut self, halign: HAlign, valign: VAlign) -> Self {
        self.halign = halign;
        self.valign = valign;
        self
    }

    pub fn color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn rotated(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }
}

/// Width in pixels of a single line of text.
pub fn text_width(text: &str, size: f32) -> f32 {
    match FONT.as_ref() {
        Some(font) if !text.is_empty() && size > 0.0 => {
            text_size(Scale::uniform(size), font, text).0.max(0) as f32
        }
        _ => 0.0,
    }
}

/// Draw one line of text anchored at (`x`, `y`).
pub fn draw_text(pixmap: &mut Pixmap, x: f32, y: f32, text: &str, style: &TextStyle) {
    if text.trim().is_empty() || style.size <= 0.0 {
        return;
    }
    let Some(font) = FONT.as_ref() else {
        return;
    };
    let Some((run, ascent)) = rasterize(font, text, style) else {
        return;
    };

    let (w, h) = (run.width() as f32, run.height() as f32);
    let dx = match style.halign {
        HAlign::Left => 0.0,
        HAlign::Center => -w / 2.0,
        HAlign::Right => -w,
    };
    let dy = match style.valign {
        VAlign::Top => 0.0,
        VAlign::Center => -h / 2.0,
        VAlign::Baseline => -ascent,
    };

    // Screen y points down, so a counter-clockwise turn is a negative angle.
    let transform = Transform::from_translate(x, y)
        .pre_rotate(-style.rotation.to_degrees())
        .pre_translate(dx, dy);
    let paint = PixmapPaint {
        quality: if style.rotation == 0.0 {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        },
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, run.as_ref(), &paint, transform, None);
}

/// Render `text` into a tight transparent pixmap. Returns it with the
/// baseline offset from its top edge.
fn rasterize(font: &Font<'static>, text: &str, style: &TextStyle) -> Option<(Pixmap, f32)> {
    let scale = Scale::uniform(style.size);
    let metrics = font.v_metrics(scale);
    let (text_w, _) = text_size(scale, font, text);
    // A little slack for glyphs that overhang their advance.
    let pad = (style.size * 0.1).ceil() as i32;
    let width = u32::try_from(text_w.max(1) + 2 * pad).ok()?;
    let height = (metrics.ascent - metrics.descent).ceil().max(1.0) as u32;

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    draw_text_mut(&mut canvas, Rgba(style.color), pad, 0, scale, font, text);

    // Blending onto transparent black leaves color scaled by coverage,
    // which is premultiplied alpha once each channel is capped by alpha.
    let mut data = canvas.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        px[0] = px[0].min(a);
        px[1] = px[1].min(a);
        px[2] = px[2].min(a);
    }
    let pixmap = Pixmap::from_vec(data, IntSize::from_wh(width, height)?)?;
    Some((pixmap, metrics.ascent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink(pixmap: &Pixmap) -> usize {
        pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
    }

    fn drawn(text: &str) -> usize {
        let mut pixmap = Pixmap::new(160, 40).unwrap();
        draw_text(&mut pixmap, 4.0, 30.0, text, &TextStyle::new(16.0));
        ink(&pixmap)
    }

    #[test]
    fn test_text_width_grows_with_length() {
        assert_eq!(text_width("", 12.0), 0.0);
        let one = text_width("A", 12.0);
        let three = text_width("AAA", 12.0);
        assert!(one > 0.0);
        assert!(three > 2.5 * one);
    }

    #[test]
    fn test_draw_text_leaves_ink() {
        assert!(drawn("Max 12.5°N") > 0);
        assert_eq!(drawn("   "), 0);
    }

    #[test]
    fn test_unit_symbols_are_drawn() {
        assert!(drawn("W/m²") > drawn("W/m"));
        assert!(drawn("μg/m3") > drawn("g/m3"));
        assert!(drawn("~") > 0);
    }

    #[test]
    fn test_lowercase_differs_from_uppercase() {
        let mut upper = Pixmap::new(120, 40).unwrap();
        let mut lower = Pixmap::new(120, 40).unwrap();
        draw_text(&mut upper, 4.0, 30.0, "TEMP", &TextStyle::new(16.0));
        draw_text(&mut lower, 4.0, 30.0, "temp", &TextStyle::new(16.0));
        assert_ne!(upper.data(), lower.data());
    }

    #[test]
    fn test_rotated_text_is_taller_than_wide() {
        let mut pixmap = Pixmap::new(60, 200).unwrap();
        let style = TextStyle::new(14.0)
            .align(HAlign::Center, VAlign::Center)
            .rotated(std::f32::consts::FRAC_PI_2);
        draw_text(&mut pixmap, 30.0, 100.0, "Latitude", &style);

        let inked: Vec<(u32, u32)> = (0..200u32)
            .flat_map(|y| (0..60u32).map(move |x| (x, y)))
            .filter(|&(x, y)| pixmap.pixel(x, y).map_or(false, |p| p.alpha() > 0))
            .collect();
        let span = |f: fn(&(u32, u32)) -> u32| {
            let lo = inked.iter().map(f).min().unwrap_or(0);
            let hi = inked.iter().map(f).max().unwrap_or(0);
            hi - lo
        };
        assert!(span(|p| p.1) > span(|p| p.0));
    }
}
