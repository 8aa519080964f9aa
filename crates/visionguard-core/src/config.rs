// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detector and batch configuration.
//
// Values come from an optional JSON file and are then overridden by command-line
// flags. Threshold values are sanitised here, whichever layer they came from:
// out-of-range numbers fall back to the defaults and produce a `ConfigWarning`
// instead of failing the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, VisionGuardError};
use crate::types::{Action, BoxConstraints, DetectorDefaults};

/// Folder name used for quarantined images when no explicit path is given.
const DEFAULT_QUARANTINE_DIR: &str = "quarantine";

/// Settings shared by the detectors and the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Size window applied to OCR boxes.
    pub constraints: BoxConstraints,
    /// Run the free-text (remote inference) detector as a cross-check.
    pub secondary_enabled: bool,
    /// Default destination for redacted images.
    pub output_path: PathBuf,
    /// Destination for FLAG_FOR_REVIEW; defaults to `<output>/quarantine`.
    pub quarantine_path: Option<PathBuf>,
    /// Destination for EXPORT_TO_FOLDER; defaults to the output path.
    pub move_to_path: Option<PathBuf>,
    /// Directory holding the OCR model files.
    pub ocr_model_dir: Option<PathBuf>,
    /// Report whole text lines instead of single words.
    pub line_segmentation: bool,
    pub inference_url: Option<String>,
    pub inference_model: Option<String>,
    /// Timeout for one inference request, in seconds.
    pub request_timeout_secs: Option<u64>,
    /// TrueType/OpenType font used for the review watermark.
    pub font_path: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            constraints: BoxConstraints::default(),
            secondary_enabled: false,
            output_path: PathBuf::from("output"),
            quarantine_path: None,
            move_to_path: None,
            ocr_model_dir: None,
            line_segmentation: false,
            inference_url: None,
            inference_model: None,
            request_timeout_secs: None,
            font_path: None,
        }
    }
}

/// Unvalidated box thresholds as typed by the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawThresholds {
    pub min_width: Option<i64>,
    pub min_height: Option<i64>,
    pub max_width: Option<i64>,
    pub max_height: Option<i64>,
}

/// A non-fatal problem found while sanitising the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A threshold was not a positive pixel count; the default was used.
    RejectedThreshold {
        flag: &'static str,
        value: i64,
        default: u32,
    },
    /// `min > max` on an axis; all thresholds went back to the defaults.
    InvertedConstraints { rejected: BoxConstraints },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RejectedThreshold {
                flag,
                value,
                default,
            } => write!(
                f,
                "{flag}={value} is not a positive pixel count; using default {default}"
            ),
            Self::InvertedConstraints { rejected } => write!(
                f,
                "minimum exceeds maximum ({}x{} > {}x{}); resetting bounding box constraints to defaults",
                rejected.min_width, rejected.min_height, rejected.max_width, rejected.max_height
            ),
        }
    }
}

/// Resolved output folders for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    /// Outline, mask and burn results.
    pub output: PathBuf,
    /// Export-with-metadata results.
    pub export: PathBuf,
    /// Flag-for-review results. Never equal to `output`.
    pub quarantine: PathBuf,
}

impl DetectorConfig {
    /// Load a configuration file (JSON). Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            VisionGuardError::Configuration(format!(
                "cannot read config file {}: {err}",
                path.display()
            ))
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|err| {
            VisionGuardError::Configuration(format!(
                "invalid config file {}: {err}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), "Configuration file loaded");
        Ok(config)
    }

    /// Apply user thresholds on top of the current constraints.
    ///
    /// Non-positive values, whether passed in `raw` or already present from a
    /// config file, are replaced by the defaults. If the result has
    /// `min > max` on either axis, all four thresholds reset to the defaults.
    /// Every correction is logged and returned.
    pub fn apply_thresholds(&mut self, raw: RawThresholds) -> Vec<ConfigWarning> {
        let defaults = DetectorDefaults::default().constraints;
        let mut warnings = Vec::new();

        let mut pick = |flag: &'static str, value: Option<i64>, current: u32, default: u32| {
            match value.or((current == 0).then_some(0)) {
                None => current,
                Some(v) => match u32::try_from(v) {
                    Ok(px) if px > 0 => px,
                    _ => {
                        warnings.push(ConfigWarning::RejectedThreshold {
                            flag,
                            value: v,
                            default,
                        });
                        default
                    }
                },
            }
        };

        let candidate = BoxConstraints {
            min_width: pick("minWidth", raw.min_width, self.constraints.min_width, defaults.min_width),
            min_height: pick(
                "minHeight",
                raw.min_height,
                self.constraints.min_height,
                defaults.min_height,
            ),
            max_width: pick("maxWidth", raw.max_width, self.constraints.max_width, defaults.max_width),
            max_height: pick(
                "maxHeight",
                raw.max_height,
                self.constraints.max_height,
                defaults.max_height,
            ),
        };

        if candidate.is_consistent() {
            self.constraints = candidate;
        } else {
            warnings.push(ConfigWarning::InvertedConstraints {
                rejected: candidate,
            });
            self.constraints = defaults;
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        warnings
    }

    /// Detector defaults with any endpoint/model/timeout overrides applied.
    pub fn detector_defaults(&self) -> DetectorDefaults {
        let mut defaults = DetectorDefaults {
            constraints: self.constraints,
            ..DetectorDefaults::default()
        };
        if let Some(url) = &self.inference_url {
            defaults.inference_url = url.clone();
        }
        if let Some(model) = &self.inference_model {
            defaults.inference_model = model.clone();
        }
        if let Some(secs) = self.request_timeout_secs {
            defaults.request_timeout = Duration::from_secs(secs.max(1));
        }
        defaults
    }

    /// Reject destination settings that conflict with `action`.
    pub fn validate_for(&self, action: Action) -> Result<()> {
        let conflict = match (&self.quarantine_path, &self.move_to_path) {
            (Some(_), Some(_)) => Some("both a quarantine path and a move-to path are set"),
            (None, Some(_)) if action == Action::FlagForReview => {
                Some("a move-to path cannot be used with FLAG_FOR_REVIEW")
            }
            (Some(_), None) if action == Action::ExportWithMetadata => {
                Some("a quarantine path cannot be used with EXPORT_TO_FOLDER")
            }
            _ => None,
        };
        if let Some(reason) = conflict {
            return Err(VisionGuardError::Configuration(format!(
                "destination paths conflict with action {action}: {reason}"
            )));
        }

        let destinations = self.destinations();
        if destinations.quarantine == destinations.output {
            return Err(VisionGuardError::Configuration(format!(
                "quarantine path {} must differ from the output path",
                destinations.quarantine.display()
            )));
        }
        Ok(())
    }

    /// Resolve the output folders for each kind of action.
    pub fn destinations(&self) -> Destinations {
        let output = self.output_path.clone();
        Destinations {
            export: self.move_to_path.clone().unwrap_or_else(|| output.clone()),
            quarantine: self
                .quarantine_path
                .clone()
                .unwrap_or_else(|| output.join(DEFAULT_QUARANTINE_DIR)),
            output,
        }
    }
}
