// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric detector — OCR word boxes filtered by size.

use tracing::{debug, error, info, instrument};
use visionguard_core::{
    BoxConstraints, DetectorConfig, DetectorDefaults, DetectorKind, Result, TextRegion,
    VisionGuardError,
};
use visionguard_imaging::{PixelBuffer, RecognizedWord, SegmentationMode, WordRecognizer};

use super::TextDetector;
use crate::detection::DetectionResult;

/// Text detector backed by a word-level OCR recognizer.
///
/// Only boxes whose width and height fall inside the configured constraints
/// (inclusive on both ends) are reported; the rest are dropped silently.
pub struct GeometricDetector {
    constraints: BoxConstraints,
    segmentation: SegmentationMode,
    recognizer: Option<Box<dyn WordRecognizer>>,
}

impl GeometricDetector {
    pub const NAME: &'static str = "ocrs";

    pub fn new(defaults: &DetectorDefaults) -> Self {
        Self {
            constraints: defaults.constraints,
            segmentation: SegmentationMode::Word,
            recognizer: None,
        }
    }

    /// Install a recognizer directly, bypassing model loading.
    pub fn with_recognizer(mut self, recognizer: impl WordRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    pub fn constraints(&self) -> BoxConstraints {
        self.constraints
    }

    pub fn segmentation(&self) -> SegmentationMode {
        self.segmentation
    }

    /// Turn an engine box into a region, clipping negative offsets. Boxes with
    /// no remaining area are discarded.
    fn to_region(word: &RecognizedWord) -> Option<TextRegion> {
        let b = word.bbox;
        let right = i64::from(b.left) + i64::from(b.width);
        let bottom = i64::from(b.top) + i64::from(b.height);
        let x = i64::from(b.left).max(0);
        let y = i64::from(b.top).max(0);
        let width = u32::try_from(right - x).ok()?;
        let height = u32::try_from(bottom - y).ok()?;
        TextRegion::new(
            u32::try_from(x).ok()?,
            u32::try_from(y).ok()?,
            width,
            height,
            word.text.clone(),
        )
        .ok()
    }

    fn load_engine(&mut self, model_dir: &str) -> Result<()> {
        #[cfg(feature = "ocr")]
        {
            let engine = visionguard_imaging::OcrEngine::from_model_dir(model_dir)?;
            self.recognizer = Some(Box::new(engine));
            Ok(())
        }

        #[cfg(not(feature = "ocr"))]
        {
            Err(VisionGuardError::Configuration(format!(
                "cannot load OCR models from {model_dir}: built without the `ocr` feature"
            )))
        }
    }
}

impl TextDetector for GeometricDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Geometric
    }

    /// `params[0]` is the OCR model directory (required); `params[1]` is a
    /// language hint, which is logged only because the models decide the
    /// script.
    fn configure(&mut self, params: &[&str]) -> Result<()> {
        let model_dir = params
            .first()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                VisionGuardError::Configuration("OCR model directory is required".into())
            })?;
        if let Some(language) = params.get(1) {
            info!(language, "Language hint noted; recognition follows the loaded models");
        }
        self.load_engine(model_dir)
    }

    fn initialize(&mut self, config: &DetectorConfig) -> Result<()> {
        self.segmentation = if config.line_segmentation {
            SegmentationMode::Line
        } else {
            SegmentationMode::Word
        };
        self.set_bounding_box_constraints(config.constraints)
    }

    fn set_bounding_box_constraints(&mut self, constraints: BoxConstraints) -> Result<()> {
        if !constraints.is_consistent() {
            return Err(VisionGuardError::Configuration(format!(
                "bounding box minimum exceeds maximum ({}x{} > {}x{})",
                constraints.min_width,
                constraints.min_height,
                constraints.max_width,
                constraints.max_height
            )));
        }
        debug!(?constraints, "Bounding box constraints updated");
        self.constraints = constraints;
        Ok(())
    }

    #[instrument(skip_all, fields(detector = Self::NAME, width = image.width(), height = image.height()))]
    fn detect<'a>(&self, image: &'a PixelBuffer) -> DetectionResult<'a> {
        let Some(recognizer) = &self.recognizer else {
            error!("Detector used before an OCR engine was configured");
            return DetectionResult::with_regions(image, Self::NAME, Vec::new());
        };

        let words = match recognizer.words(image.image(), self.segmentation) {
            Ok(words) => words,
            Err(err) => {
                error!(%err, "OCR failed; treating image as text-free");
                Vec::new()
            }
        };

        let total = words.len();
        let regions: Vec<TextRegion> = words
            .iter()
            .filter_map(Self::to_region)
            .filter(|region| region.fits(&self.constraints))
            .collect();

        debug!(total, kept = regions.len(), "Word boxes filtered");
        DetectionResult::with_regions(image, Self::NAME, regions)
    }

    fn is_ready(&self) -> bool {
        self.recognizer.is_some()
    }
}
