// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster codec (JPEG, PNG, BMP, TIFF) via the `image` crate.

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use tracing::info;
use visionguard_core::{Result, VisionGuardError};

/// Load a raster image from disk.
pub fn decode(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path).map_err(|err| {
        VisionGuardError::Decode(format!("failed to open {}: {}", path.display(), err))
    })?;
    Ok(img)
}

/// Write a raster image. The format is inferred from the file extension.
///
/// Formats without an alpha channel (JPEG) receive an RGB copy.
pub fn encode(image: &DynamicImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path).map_err(|err| {
        VisionGuardError::Persist(format!(
            "cannot determine output format for {}: {}",
            path.display(),
            err
        ))
    })?;

    let result = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format)
    } else {
        image.save_with_format(path, format)
    };
    result.map_err(|err| {
        VisionGuardError::Persist(format!(
            "failed to save image to {}: {}",
            path.display(),
            err
        ))
    })?;

    info!(path = %path.display(), ?format, "Image saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn rgba_image_saves_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 128])));
        encode(&img, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unknown_extension_is_a_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.unknownfmt");
        let img = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        assert!(matches!(
            encode(&img, &path),
            Err(VisionGuardError::Persist(_))
        ));
    }
}
