// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified detection result shared by every detector.

use visionguard_core::TextRegion;
use visionguard_imaging::PixelBuffer;

/// What one detector found in one image.
///
/// The result borrows the decoded buffer it was produced from, so it cannot
/// outlive the file pass that created it. A geometric detector fills
/// `regions`; a free-text detector fills `raw_text`.
#[derive(Debug, Clone)]
pub struct DetectionResult<'a> {
    image: &'a PixelBuffer,
    detector: &'static str,
    regions: Option<Vec<TextRegion>>,
    raw_text: Option<String>,
}

impl<'a> DetectionResult<'a> {
    /// Result carrying positioned regions, in emission order.
    pub fn with_regions(image: &'a PixelBuffer, detector: &'static str, regions: Vec<TextRegion>) -> Self {
        Self {
            image,
            detector,
            regions: Some(regions),
            raw_text: None,
        }
    }

    /// Result carrying an unstructured response.
    pub fn with_text(image: &'a PixelBuffer, detector: &'static str, text: impl Into<String>) -> Self {
        Self {
            image,
            detector,
            regions: None,
            raw_text: Some(text.into()),
        }
    }

    pub fn image(&self) -> &'a PixelBuffer {
        self.image
    }

    pub fn detector(&self) -> &'static str {
        self.detector
    }

    pub fn regions(&self) -> Option<&[TextRegion]> {
        self.regions.as_deref()
    }

    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    pub fn region_count(&self) -> usize {
        self.regions.as_ref().map_or(0, Vec::len)
    }

    /// True when the detector found nothing: no regions and no non-blank text.
    pub fn is_empty(&self) -> bool {
        self.region_count() == 0 && self.raw_text.as_deref().is_none_or(|t| t.trim().is_empty())
    }
}
