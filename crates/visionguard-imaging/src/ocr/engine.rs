// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word recognizer backed by `ocrs`.
//
// A model directory holds `text-detection.rten` (finds word boxes) and
// `text-recognition.rten` (reads characters). Running `ocrs-cli` once on any
// image populates `~/.cache/ocrs`, which is where `default_model_dir` points.
// Build `ocrs` and `rten` with optimisations; unoptimised inference is
// unusably slow on full-page scans.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info, instrument};
use visionguard_core::{Result, VisionGuardError};

use super::{RecognizedWord, SegmentationMode, WordRecognizer, default_model_dir};

/// The two model files the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl ModelPaths {
    const DETECTION_FILE: &'static str = "text-detection.rten";
    const RECOGNITION_FILE: &'static str = "text-recognition.rten";

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(Self::DETECTION_FILE),
            recognition: dir.join(Self::RECOGNITION_FILE),
        }
    }

    /// Fail with a configuration error naming the first missing file.
    pub fn check(&self) -> Result<()> {
        match [&self.detection, &self.recognition].into_iter().find(|p| !p.is_file()) {
            Some(missing) => Err(VisionGuardError::Configuration(format!(
                "OCR model {} is missing; point --ocrModels at a directory holding {} and {}",
                missing.display(),
                Self::DETECTION_FILE,
                Self::RECOGNITION_FILE
            ))),
            None => Ok(()),
        }
    }
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self::in_dir(default_model_dir())
    }
}

fn load_model(role: &str, path: &Path) -> Result<Model> {
    info!(role, path = %path.display(), "Loading OCR model");
    Model::load_file(path).map_err(|err| {
        VisionGuardError::Configuration(format!(
            "cannot load OCR {role} model {}: {err}",
            path.display()
        ))
    })
}

/// An initialised `ocrs` engine. Loading is slow, so one engine serves the
/// whole batch.
pub struct OcrEngine {
    inner: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(detection = %paths.detection.display()))]
    pub fn load(paths: &ModelPaths) -> Result<Self> {
        paths.check()?;
        let inner = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(load_model("detection", &paths.detection)?),
            recognition_model: Some(load_model("recognition", &paths.recognition)?),
            ..Default::default()
        })
        .map_err(|err| VisionGuardError::Configuration(format!("OCR engine setup failed: {err}")))?;
        info!("OCR engine ready");
        Ok(Self { inner })
    }

    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(&ModelPaths::in_dir(dir))
    }
}

fn to_word(item: &impl TextItem, text: String) -> RecognizedWord {
    let rect = item.bounding_rect();
    RecognizedWord::new(rect.left(), rect.top(), rect.width(), rect.height(), text)
}

impl WordRecognizer for OcrEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), ?mode))]
    fn words(&self, image: &DynamicImage, mode: SegmentationMode) -> Result<Vec<RecognizedWord>> {
        let detection = |stage: &str, err: &dyn std::fmt::Display| {
            VisionGuardError::Detection(format!("OCR {stage} failed: {err}"))
        };

        let pixels = image.to_rgb8();
        let source = ImageSource::from_bytes(pixels.as_raw(), pixels.dimensions())
            .map_err(|err| detection("input conversion", &err))?;
        let input = self
            .inner
            .prepare_input(source)
            .map_err(|err| detection("preprocessing", &err))?;

        let boxes = self
            .inner
            .detect_words(&input)
            .map_err(|err| detection("word detection", &err))?;
        let lines = self.inner.find_text_lines(&input, &boxes);
        let recognized = self
            .inner
            .recognize_text(&input, &lines)
            .map_err(|err| detection("recognition", &err))?;

        let words: Vec<RecognizedWord> = match mode {
            SegmentationMode::Line => recognized
                .iter()
                .flatten()
                .map(|line| to_word(line, line.to_string()))
                .collect(),
            SegmentationMode::Word => recognized
                .iter()
                .flatten()
                .flat_map(|line| line.words().map(|w| to_word(&w, w.to_string())).collect::<Vec<_>>())
                .collect(),
        };

        debug!(boxes = boxes.len(), returned = words.len(), "OCR pass complete");
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_paths_live_in_one_directory() {
        let paths = ModelPaths::in_dir("/srv/models");
        assert_eq!(paths.detection, PathBuf::from("/srv/models/text-detection.rten"));
        assert_eq!(paths.recognition.parent(), Some(Path::new("/srv/models")));
        assert!(ModelPaths::default().detection.ends_with("text-detection.rten"));
    }

    #[test]
    fn missing_model_is_fatal_and_named() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("text-detection.rten"), b"").unwrap();

        let err = ModelPaths::in_dir(dir.path()).check().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("text-recognition.rten"));
    }

    #[test]
    fn engine_refuses_to_load_without_models() {
        assert!(OcrEngine::from_model_dir("/nonexistent/ocrs").err().unwrap().is_fatal());
    }
}
