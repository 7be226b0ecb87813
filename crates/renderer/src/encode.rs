//! Output formats and figure saving.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use diags_common::{DiagsError, DiagsResult};
use image::{DynamicImage, ImageOutputFormat, RgbImage, RgbaImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use tracing::debug;

use crate::figure::Figure;
use crate::png::encode_png;

/// JPEG quality used for saved figures.
const JPEG_QUALITY: u8 = 90;

/// Millimetres per inch, for PDF page sizes.
const MM_PER_INCH: f32 = 25.4;

/// Formats a figure can be written as. PDF embeds the raster page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    Gif,
    Pdf,
}

/// Lowercase a format name and keep only its last `.`-separated component,
/// so `"PNG"`, `".png"` and `"plot.png"` all become `"png"`.
pub fn normalize_format(format: &str) -> String {
    let lower = format.trim().to_lowercase();
    match lower.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => lower,
    }
}

impl OutputFormat {
    pub fn parse(format: &str) -> DiagsResult<Self> {
        match normalize_format(format).as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "tif" | "tiff" => Ok(Self::Tiff),
            "gif" => Ok(Self::Gif),
            "pdf" => Ok(Self::Pdf),
            _ => Err(DiagsError::UnsupportedFormat(format.to_string())),
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode a figure into the bytes of `format`.
pub fn encode(figure: &Figure, format: OutputFormat) -> DiagsResult<Vec<u8>> {
    let (width, height) = (figure.width(), figure.height());
    let rgba = figure.rgba();

    match format {
        OutputFormat::Png => encode_png(&rgba, width as usize, height as usize, figure.dpi()),
        OutputFormat::Jpeg => {
            let mut out = Vec::new();
            let mut cursor = Cursor::new(&mut out);
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
            encoder
                .encode(&to_rgb(&rgba), width, height, image::ColorType::Rgb8)
                .map_err(|e| DiagsError::RenderError(format!("JPEG encoding failed: {}", e)))?;
            Ok(out)
        }
        OutputFormat::Pdf => encode_pdf(figure, to_rgb(&rgba)),
        OutputFormat::Bmp | OutputFormat::Tiff | OutputFormat::Gif => {
            let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(size_mismatch)?;
            let target = match format {
                OutputFormat::Bmp => ImageOutputFormat::Bmp,
                OutputFormat::Tiff => ImageOutputFormat::Tiff,
                _ => ImageOutputFormat::Gif,
            };
            let mut cursor = Cursor::new(Vec::new());
            DynamicImage::ImageRgba8(image)
                .write_to(&mut cursor, target)
                .map_err(|e| {
                    DiagsError::RenderError(format!("{} encoding failed: {}", format, e))
                })?;
            Ok(cursor.into_inner())
        }
    }
}

/// One page the size of the figure, holding the page as an image at the
/// figure's dpi.
fn encode_pdf(figure: &Figure, rgb: Vec<u8>) -> DiagsResult<Vec<u8>> {
    let (width, height) = (figure.width(), figure.height());
    let dpi = figure.dpi();
    let page_w = Mm(width as f32 / dpi * MM_PER_INCH);
    let page_h = Mm(height as f32 / dpi * MM_PER_INCH);

    let (doc, page, layer) = PdfDocument::new("Diagnostics figure", page_w, page_h, "Figure");
    let image = RgbImage::from_raw(width, height, rgb).ok_or_else(size_mismatch)?;
    Image::from_dynamic_image(&DynamicImage::ImageRgb8(image)).add_to_layer(
        doc.get_page(page).get_layer(layer),
        ImageTransform {
            dpi: Some(dpi),
            ..ImageTransform::default()
        },
    );
    doc.save_to_bytes()
        .map_err(|e| DiagsError::RenderError(format!("PDF encoding failed: {}", e)))
}

fn to_rgb(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect()
}

fn size_mismatch() -> DiagsError {
    DiagsError::RenderError("pixel buffer does not match figure size".into())
}

impl Figure {
    /// Encode and write the figure to `path`.
    pub fn save(&self, path: &Path, format: OutputFormat) -> DiagsResult<()> {
        let bytes = encode(self, format)?;
        std::fs::write(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), %format, "Wrote figure");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_format() {
        assert_eq!(normalize_format("PNG"), "png");
        assert_eq!(normalize_format("figure.Png"), "png");
        assert_eq!(normalize_format(".jpeg"), "jpeg");
        assert_eq!(normalize_format(" pdf "), "pdf");
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(OutputFormat::parse("png").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("JPG").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("tif").unwrap(), OutputFormat::Tiff);
        assert_eq!(OutputFormat::parse("PDF").unwrap(), OutputFormat::Pdf);
        for vector in ["svg", "eps", "ps", "webp"] {
            assert!(matches!(
                OutputFormat::parse(vector),
                Err(DiagsError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_encode_magic_bytes() {
        let figure = Figure::new([1.0, 0.5], 20.0).unwrap();
        assert_eq!(&encode(&figure, OutputFormat::Png).unwrap()[1..4], b"PNG");
        assert_eq!(&encode(&figure, OutputFormat::Jpeg).unwrap()[0..2], &[0xFF, 0xD8]);
        assert_eq!(&encode(&figure, OutputFormat::Bmp).unwrap()[0..2], b"BM");
        assert_eq!(&encode(&figure, OutputFormat::Gif).unwrap()[0..3], b"GIF");
        assert_eq!(&encode(&figure, OutputFormat::Pdf).unwrap()[0..5], b"%PDF-");
        let tiff = encode(&figure, OutputFormat::Tiff).unwrap();
        assert!(&tiff[0..2] == b"II" || &tiff[0..2] == b"MM");
    }
}
