// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Redaction transforms — outline, mask, burn, and the review watermark.
//
// Every function here is pure: it reads the source image, draws on an RGBA
// copy, and returns the copy. The source is never touched, so the same decoded
// image can be redacted several times within one file pass.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, info, instrument, warn};
use visionguard_core::{ImageKind, TextRegion};

/// Semi-transparent red used for outlines.
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 128]);

/// Opaque black used for masks.
pub const MASK_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Semi-transparent red used to burn ordinary images.
pub const BURN_COLOR: Rgba<u8> = Rgba([255, 0, 0, 128]);

/// Solid white used to burn DICOM images; a translucent tint is nearly
/// invisible on grayscale content.
pub const DICOM_BURN_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Semi-transparent red used for the review watermark.
pub const WATERMARK_COLOR: Rgba<u8> = Rgba([255, 0, 0, 128]);

/// Fonts tried, in order, when no watermark font is configured.
const SYSTEM_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Draw a translucent outline around each region.
///
/// With no regions the result is a pixel-identical copy of the source.
#[instrument(skip_all, fields(regions = regions.len()))]
pub fn outline(image: &DynamicImage, regions: &[TextRegion]) -> DynamicImage {
    if regions.is_empty() {
        debug!("No regions to outline");
        return image.clone();
    }
    let mut canvas = Blend(image.to_rgba8());
    for region in regions {
        draw_hollow_rect_mut(&mut canvas, to_rect(region), OUTLINE_COLOR);
    }
    DynamicImage::ImageRgba8(canvas.0)
}

/// Cover each region with opaque black.
#[instrument(skip_all, fields(regions = regions.len()))]
pub fn mask(image: &DynamicImage, regions: &[TextRegion]) -> DynamicImage {
    let mut canvas: RgbaImage = image.to_rgba8();
    for region in regions {
        draw_filled_rect_mut(&mut canvas, to_rect(region), MASK_COLOR);
    }
    DynamicImage::ImageRgba8(canvas)
}

/// Fill each region with the burn colour for the image's provenance.
#[instrument(skip_all, fields(regions = regions.len(), ?kind))]
pub fn burn(image: &DynamicImage, regions: &[TextRegion], kind: ImageKind) -> DynamicImage {
    let color = burn_color(kind);
    let mut canvas = Blend(image.to_rgba8());
    for region in regions {
        draw_filled_rect_mut(&mut canvas, to_rect(region), color);
    }
    DynamicImage::ImageRgba8(canvas.0)
}

/// The fill used by [`burn`] for a given source kind.
pub fn burn_color(kind: ImageKind) -> Rgba<u8> {
    match kind {
        ImageKind::Dicom => DICOM_BURN_COLOR,
        ImageKind::Raster => BURN_COLOR,
    }
}

/// Convert a region into an imageproc rectangle. Regions are never empty, so
/// `of_size` cannot panic.
fn to_rect(region: &TextRegion) -> Rect {
    let x = i32::try_from(region.x()).unwrap_or(i32::MAX);
    let y = i32::try_from(region.y()).unwrap_or(i32::MAX);
    Rect::at(x, y).of_size(region.width(), region.height())
}

/// Centered, semi-transparent text stamp applied to images held for review.
pub struct Watermark {
    text: String,
    scale: f32,
    font: Option<FontVec>,
}

impl Watermark {
    pub const DEFAULT_TEXT: &'static str = "QUARANTINE";
    pub const DEFAULT_SCALE: f32 = 48.0;

    /// Build a watermark, loading the font from `font_path` or, failing that,
    /// from common system locations. Without any usable font the stamp falls
    /// back to a translucent band across the middle of the image.
    pub fn load(font_path: Option<&Path>) -> Self {
        let font = font_path
            .and_then(|path| {
                let font = read_font(path);
                if font.is_none() {
                    warn!(path = %path.display(), "Watermark font could not be loaded");
                }
                font
            })
            .or_else(|| {
                SYSTEM_FONT_PATHS
                    .iter()
                    .find_map(|path| read_font(Path::new(path)))
            });

        if font.is_none() {
            warn!("No watermark font found; review stamps will use a plain band");
        }
        Self {
            text: Self::DEFAULT_TEXT.to_string(),
            scale: Self::DEFAULT_SCALE,
            font,
        }
    }

    /// A watermark that never renders text, only the fallback band.
    pub fn without_font() -> Self {
        Self {
            text: Self::DEFAULT_TEXT.to_string(),
            scale: Self::DEFAULT_SCALE,
            font: None,
        }
    }

    /// Stamp the watermark onto a copy of `image`.
    #[instrument(skip_all, fields(text = %self.text))]
    pub fn stamp(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = (image.width(), image.height());
        let mut canvas = Blend(image.to_rgba8());

        match &self.font {
            Some(font) => {
                let scale = PxScale::from(self.scale);
                let (text_w, text_h) = text_size(scale, font, &self.text);
                let x = (width as i32 - text_w as i32) / 2;
                let y = (height as i32 - text_h as i32) / 2;
                draw_text_mut(&mut canvas, WATERMARK_COLOR, x, y, scale, font, &self.text);
            }
            None => {
                let band_h = (height / 8).max(1);
                let top = (height.saturating_sub(band_h) / 2) as i32;
                let band = Rect::at(0, top).of_size(width.max(1), band_h);
                draw_filled_rect_mut(&mut canvas, band, WATERMARK_COLOR);
            }
        }
        DynamicImage::ImageRgba8(canvas.0)
    }
}

fn read_font(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    let font = FontVec::try_from_vec(data).ok()?;
    info!(path = %path.display(), "Loaded watermark font");
    Some(font)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgba<u8> = Rgba([200, 200, 200, 255]);

    fn source() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 30, BACKGROUND))
    }

    fn region(x: u32, y: u32, w: u32, h: u32) -> TextRegion {
        TextRegion::new(x, y, w, h, "PHI").unwrap()
    }

    #[test]
    fn mask_covers_exactly_the_region() {
        let src = source();
        let out = mask(&src, &[region(5, 5, 10, 10)]).to_rgba8();
        let original = src.to_rgba8();

        for (x, y, pixel) in out.enumerate_pixels() {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                assert_eq!(*pixel, MASK_COLOR, "pixel ({x}, {y}) should be masked");
            } else {
                assert_eq!(pixel, original.get_pixel(x, y), "pixel ({x}, {y}) changed");
            }
        }
    }

    #[test]
    fn outline_without_regions_is_identical() {
        let src = source();
        let out = outline(&src, &[]);
        assert_eq!(out.as_bytes(), src.as_bytes());
        assert_eq!(out.color(), src.color());
    }

    #[test]
    fn outline_touches_border_but_not_interior() {
        let src = source();
        let out = outline(&src, &[region(5, 5, 10, 10)]).to_rgba8();
        assert_ne!(*out.get_pixel(5, 5), BACKGROUND);
        assert_ne!(*out.get_pixel(14, 9), BACKGROUND);
        assert_eq!(*out.get_pixel(9, 9), BACKGROUND);
        assert_eq!(*out.get_pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn burn_tints_raster_and_whitens_dicom() {
        let src = source();
        let raster = burn(&src, &[region(2, 2, 4, 4)], ImageKind::Raster).to_rgba8();
        let dicom = burn(&src, &[region(2, 2, 4, 4)], ImageKind::Dicom).to_rgba8();

        let tinted = raster.get_pixel(3, 3);
        assert!(tinted[0] > tinted[1], "raster burn should lean red, got {tinted:?}");
        assert_eq!(*dicom.get_pixel(3, 3), DICOM_BURN_COLOR);
        assert_eq!(*raster.get_pixel(20, 20), BACKGROUND);
    }

    #[test]
    fn transforms_leave_source_untouched() {
        let src = source();
        let before = src.as_bytes().to_vec();
        let regions = [region(1, 1, 8, 8)];

        let _ = outline(&src, &regions);
        let _ = mask(&src, &regions);
        let _ = burn(&src, &regions, ImageKind::Raster);
        let _ = Watermark::without_font().stamp(&src);

        assert_eq!(src.as_bytes(), before.as_slice());
    }

    #[test]
    fn regions_past_the_edge_are_clipped() {
        let src = source();
        let out = mask(&src, &[region(25, 25, 100, 100)]).to_rgba8();
        assert_eq!(*out.get_pixel(29, 29), MASK_COLOR);
        assert_eq!(*out.get_pixel(24, 24), BACKGROUND);
    }

    #[test]
    fn fallback_watermark_marks_the_center() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 100, BACKGROUND));
        let out = Watermark::without_font().stamp(&src).to_rgba8();
        assert_ne!(*out.get_pixel(100, 50), BACKGROUND);
        assert_eq!(*out.get_pixel(100, 2), BACKGROUND);
    }

    #[test]
    fn loaded_watermark_changes_the_image() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(400, 200, BACKGROUND));
        let watermark = Watermark::load(None);
        let out = watermark.stamp(&src);
        assert_ne!(out.as_bytes(), src.as_bytes());
    }
}
