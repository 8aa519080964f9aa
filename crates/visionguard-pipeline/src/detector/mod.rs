// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text detector abstraction.
//
// Two implementations exist: `GeometricDetector` (OCR words with bounding
// boxes) and `FreeTextDetector` (a vision model's unstructured reply). The
// batch orchestrator only ever sees `dyn TextDetector`.

pub mod freetext;
pub mod geometric;

use std::path::PathBuf;

use visionguard_core::{Action, BoxConstraints, DetectorConfig, DetectorKind, Result};
use visionguard_imaging::PixelBuffer;

use crate::detection::DetectionResult;
use crate::dispatch::{self, ActionDispatcher};

/// A pluggable source of text detections.
///
/// Setup happens in three steps before the first `detect` call:
/// `initialize` applies the run configuration, `configure` receives the
/// positional parameters (model directory, endpoint, ...), and `is_ready`
/// confirms that the required collaborator is in place. Missing setup is a
/// configuration error; everything that goes wrong inside `detect` degrades to
/// an empty result instead.
pub trait TextDetector {
    /// Registry name, also used in file names and reports.
    fn name(&self) -> &'static str;

    fn kind(&self) -> DetectorKind;

    /// Apply positional setup parameters. Meaning is detector specific.
    fn configure(&mut self, params: &[&str]) -> Result<()>;

    /// Apply the run configuration.
    fn initialize(&mut self, config: &DetectorConfig) -> Result<()>;

    /// Replace the live box-size thresholds.
    fn set_bounding_box_constraints(&mut self, constraints: BoxConstraints) -> Result<()>;

    /// Detect text in `image`. Never fails; errors yield an empty result.
    fn detect<'a>(&self, image: &'a PixelBuffer) -> DetectionResult<'a>;

    fn is_ready(&self) -> bool;

    fn supports(&self, action: Action) -> bool {
        dispatch::supports(self.kind(), action)
    }

    /// Run `action` on `result` and return the files written.
    fn apply_action(
        &self,
        action: Action,
        result: &DetectionResult<'_>,
        dispatcher: &ActionDispatcher,
        original_name: &str,
    ) -> Result<Vec<PathBuf>> {
        dispatcher.dispatch(self.kind(), action, result, original_name)
    }
}
