// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec — decode files into `PixelBuffer`s and write redacted images
// back out. Raster formats go through the `image` crate; DICOM files go through
// dicom-rs when the `dicom` feature is enabled.

pub mod raster;

#[cfg(feature = "dicom")]
pub mod dicom;

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};
use visionguard_core::{ImageKind, Result, VisionGuardError};

use crate::buffer::PixelBuffer;

/// Classify `path` by its extension.
pub fn classify(path: &Path) -> Option<ImageKind> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageKind::from_extension)
}

/// Decode the file at `path`, choosing the codec from its extension.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn decode(path: &Path) -> Result<PixelBuffer> {
    let kind = classify(path).ok_or_else(|| {
        VisionGuardError::Decode(format!("unsupported image type: {}", path.display()))
    })?;

    let image = match kind {
        ImageKind::Raster => raster::decode(path)?,
        ImageKind::Dicom => decode_dicom(path)?,
    };
    debug!(
        width = image.width(),
        height = image.height(),
        ?kind,
        "Image decoded"
    );
    Ok(PixelBuffer::new(image, kind))
}

/// Encode `image` to `path`. DICOM targets get freshly synthesised metadata;
/// everything else uses the format implied by the extension.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn encode(image: &DynamicImage, path: &Path) -> Result<()> {
    match classify(path) {
        Some(ImageKind::Dicom) => encode_dicom(image, path),
        _ => raster::encode(image, path),
    }
}

/// Encode an image as PNG bytes (used for the inference payload).
pub fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| VisionGuardError::Persist(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}

#[cfg(feature = "dicom")]
fn decode_dicom(path: &Path) -> Result<DynamicImage> {
    dicom::decode(path)
}

#[cfg(not(feature = "dicom"))]
fn decode_dicom(path: &Path) -> Result<DynamicImage> {
    Err(VisionGuardError::Decode(format!(
        "{}: DICOM support is not compiled in (enable the `dicom` feature)",
        path.display()
    )))
}

#[cfg(feature = "dicom")]
fn encode_dicom(image: &DynamicImage, path: &Path) -> Result<()> {
    dicom::encode(image, path)
}

#[cfg(not(feature = "dicom"))]
fn encode_dicom(_image: &DynamicImage, path: &Path) -> Result<()> {
    Err(VisionGuardError::Persist(format!(
        "{}: DICOM support is not compiled in (enable the `dicom` feature)",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify(Path::new("a/scan.DCM")), Some(ImageKind::Dicom));
        assert_eq!(classify(Path::new("photo.jpeg")), Some(ImageKind::Raster));
        assert_eq!(classify(Path::new("notes.txt")), None);
        assert_eq!(classify(Path::new("no_extension")), None);
    }

    #[test]
    fn decode_rejects_unsupported_extension() {
        let err = decode(Path::new("/nonexistent/readme.md")).unwrap_err();
        assert!(matches!(err, VisionGuardError::Decode(_)));
    }

    #[test]
    fn png_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 255])));

        encode(&img, &path).unwrap();
        let decoded = decode(&path).unwrap();

        assert_eq!(decoded.kind(), ImageKind::Raster);
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(decoded.image().to_rgba8().get_pixel(3, 3), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn corrupted_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG not really").unwrap();
        assert!(matches!(decode(&path), Err(VisionGuardError::Decode(_))));
    }

    #[test]
    fn png_bytes_have_png_signature() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        let bytes = png_bytes(&img).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}
