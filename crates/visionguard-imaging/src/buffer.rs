// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoded pixel buffer plus the provenance the redaction step needs.

use image::DynamicImage;
use visionguard_core::ImageKind;

/// A decoded image and where it came from.
///
/// Detectors and redaction transforms only ever borrow a `PixelBuffer`; every
/// transform returns a new image, so one buffer can feed several detectors and
/// actions during a single file pass.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    image: DynamicImage,
    kind: ImageKind,
}

impl PixelBuffer {
    pub fn new(image: DynamicImage, kind: ImageKind) -> Self {
        Self { image, kind }
    }

    /// Wrap an ordinary raster image.
    pub fn raster(image: DynamicImage) -> Self {
        Self::new(image, ImageKind::Raster)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
