// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR collaborator — the seam between the geometric detector and whatever
// engine actually reads the pixels.
//
// The `ocrs`-backed implementation lives in `engine` and is only compiled with
// the `ocr` feature:
//
// ```toml
// visionguard-imaging = { path = "crates/visionguard-imaging", features = ["ocr"] }
// ```

#[cfg(feature = "ocr")]
pub mod engine;

use std::path::PathBuf;

use image::DynamicImage;
use visionguard_core::Result;

/// Where `ocrs-cli` caches its models: `$XDG_CACHE_HOME/ocrs`, else
/// `$HOME/.cache/ocrs`, else `./ocrs-models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .map(|cache| cache.join("ocrs"))
        .unwrap_or_else(|| PathBuf::from("ocrs-models"))
}

/// Granularity of the boxes returned by a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentationMode {
    /// One box per word.
    #[default]
    Word,
    /// One box per text line.
    Line,
}

/// Axis-aligned box as reported by the engine. Coordinates may fall outside
/// the image; callers clip or discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// A piece of recognised text with its bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedWord {
    pub bbox: WordBox,
    pub text: String,
}

impl RecognizedWord {
    pub fn new(left: i32, top: i32, width: i32, height: i32, text: impl Into<String>) -> Self {
        Self {
            bbox: WordBox {
                left,
                top,
                width,
                height,
            },
            text: text.into(),
        }
    }
}

/// Anything that can turn pixels into positioned text.
pub trait WordRecognizer {
    /// Recognise text in `image`, returning boxes at the requested granularity
    /// in reading order.
    fn words(&self, image: &DynamicImage, mode: SegmentationMode) -> Result<Vec<RecognizedWord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_segmentation_is_the_default() {
        assert_eq!(SegmentationMode::default(), SegmentationMode::Word);
    }

    #[test]
    fn recognized_word_keeps_raw_engine_box() {
        let word = RecognizedWord::new(-3, 4, 20, 0, "MRN");
        assert_eq!(
            word.bbox,
            WordBox {
                left: -3,
                top: 4,
                width: 20,
                height: 0,
            }
        );
        assert_eq!(word.text, "MRN");
    }

    #[test]
    fn model_dir_ends_in_a_cache_folder() {
        let dir = default_model_dir();
        let name = dir.file_name().and_then(|n| n.to_str());
        assert!(matches!(name, Some("ocrs" | "ocrs-models")), "{}", dir.display());
    }
}
