// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the VisionGuard redaction pipeline.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VisionGuardError};

/// A detected region of text, in image pixel coordinates.
///
/// Immutable once created. Width and height are always non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRegion {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    text: String,
}

impl TextRegion {
    /// Create a region, rejecting zero-sized boxes.
    pub fn new(x: u32, y: u32, width: u32, height: u32, text: impl Into<String>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(VisionGuardError::Detection(format!(
                "text region at ({x}, {y}) has zero size ({width}x{height})"
            )));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
            text: text.into(),
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The text exactly as the detector emitted it (possibly untrimmed).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Area of the intersection with `other`, zero when they do not touch.
    pub fn intersection_area(&self, other: &TextRegion) -> u64 {
        let left = u64::from(self.x.max(other.x));
        let top = u64::from(self.y.max(other.y));
        let right = (u64::from(self.x) + u64::from(self.width))
            .min(u64::from(other.x) + u64::from(other.width));
        let bottom = (u64::from(self.y) + u64::from(self.height))
            .min(u64::from(other.y) + u64::from(other.height));
        right.saturating_sub(left) * bottom.saturating_sub(top)
    }

    /// Whether the box passes the inclusive size window in `constraints`.
    pub fn fits(&self, constraints: &BoxConstraints) -> bool {
        (constraints.min_width..=constraints.max_width).contains(&self.width)
            && (constraints.min_height..=constraints.max_height).contains(&self.height)
    }
}

impl fmt::Display for TextRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Text: {}, Bounding Box: [{}, {}, {}, {}]",
            self.text.trim(),
            self.x,
            self.y,
            self.width,
            self.height
        )
    }
}

/// Redaction operations applied to an image once text has been found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Draw a translucent outline around each region.
    Outline,
    /// Cover each region with an opaque fill.
    Mask,
    /// Burn a translucent (or, for DICOM, solid white) fill into each region.
    Burn,
    /// Write the image and a sidecar metadata file to the export folder.
    #[serde(rename = "EXPORT_TO_FOLDER")]
    ExportWithMetadata,
    /// Watermark the image and move it to the quarantine folder.
    FlagForReview,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Outline,
        Action::Mask,
        Action::Burn,
        Action::ExportWithMetadata,
        Action::FlagForReview,
    ];

    /// The command-line spelling of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outline => "OUTLINE",
            Self::Mask => "MASK",
            Self::Burn => "BURN",
            Self::ExportWithMetadata => "EXPORT_TO_FOLDER",
            Self::FlagForReview => "FLAG_FOR_REVIEW",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = VisionGuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OUTLINE" => Ok(Self::Outline),
            "MASK" => Ok(Self::Mask),
            "BURN" => Ok(Self::Burn),
            "EXPORT_TO_FOLDER" | "EXPORT" | "MOVE_TO_FOLDER" => Ok(Self::ExportWithMetadata),
            "FLAG_FOR_REVIEW" | "QUARANTINE" => Ok(Self::FlagForReview),
            other => Err(VisionGuardError::Configuration(format!(
                "invalid action '{other}'; use OUTLINE, MASK, BURN, EXPORT_TO_FOLDER, or FLAG_FOR_REVIEW"
            ))),
        }
    }
}

/// The two detector variants. Dispatch support is keyed on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    /// Produces bounding boxes plus text.
    Geometric,
    /// Produces unstructured text only.
    FreeText,
}

/// Where an image came from, which drives both decoding and burn colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    /// JPEG, PNG, BMP, TIFF and friends.
    Raster,
    /// DICOM medical image.
    Dicom,
}

impl ImageKind {
    /// Classify a file by extension. Returns `None` for unsupported files.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "bmp" | "tif" | "tiff" => Some(Self::Raster),
            "dcm" | "dicom" => Some(Self::Dicom),
            _ => None,
        }
    }
}

/// Inclusive size window applied to OCR bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxConstraints {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl BoxConstraints {
    /// Build a window, rejecting `min > max` on either axis.
    pub fn new(min_width: u32, min_height: u32, max_width: u32, max_height: u32) -> Result<Self> {
        let constraints = Self {
            min_width,
            min_height,
            max_width,
            max_height,
        };
        if constraints.is_consistent() {
            Ok(constraints)
        } else {
            Err(VisionGuardError::Configuration(format!(
                "invalid bounding box constraints {min_width}x{min_height}..{max_width}x{max_height}: min must be <= max"
            )))
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.min_width <= self.max_width && self.min_height <= self.max_height
    }
}

impl Default for BoxConstraints {
    fn default() -> Self {
        DetectorDefaults::default().constraints
    }
}

/// Immutable defaults handed to detector constructors.
#[derive(Debug, Clone)]
pub struct DetectorDefaults {
    pub constraints: BoxConstraints,
    /// Remote inference endpoint for the free-text detector.
    pub inference_url: String,
    /// Vision model requested from the inference endpoint.
    pub inference_model: String,
    /// Upper bound on a single inference request.
    pub request_timeout: Duration,
}

impl Default for DetectorDefaults {
    fn default() -> Self {
        Self {
            constraints: BoxConstraints {
                min_width: 10,
                min_height: 10,
                max_width: 500,
                max_height: 500,
            },
            inference_url: "http://localhost:11434/api/generate".into(),
            inference_model: "llama3.2-vision:latest".into(),
            request_timeout: Duration::from_secs(120),
        }
    }
}
