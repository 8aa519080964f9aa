// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// visionguard-imaging — Image handling for the VisionGuard redaction pipeline.
//
// Provides the image codec (raster formats plus DICOM behind the `dicom`
// feature), the pure redaction transforms (outline, mask, burn, review
// watermark), and the OCR word recognizer (behind the `ocr` feature).

pub mod buffer;
pub mod codec;
pub mod ocr;
pub mod redact;

// Re-export the primary types so callers can use `visionguard_imaging::PixelBuffer` etc.
pub use buffer::PixelBuffer;
pub use ocr::{RecognizedWord, SegmentationMode, WordBox, WordRecognizer, default_model_dir};
pub use redact::Watermark;

#[cfg(feature = "ocr")]
pub use ocr::engine::{ModelPaths, OcrEngine};
