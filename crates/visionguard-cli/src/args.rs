// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and their translation into a `DetectorConfig`.
//
// Precedence, lowest first: built-in defaults, the `--config` JSON file, then
// individual flags.

use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};
use visionguard_core::{Action, ConfigWarning, DetectorConfig, RawThresholds, Result};

pub const ACTIONS_HELP: &str = "\
Actions:
  OUTLINE            draw a translucent red box around each text region
  MASK               cover each text region with solid black
  BURN               fill each text region (solid white for DICOM)
  EXPORT_TO_FOLDER   copy the image plus a metadata sidecar (alias MOVE_TO_FOLDER)
  FLAG_FOR_REVIEW    watermark a copy into the quarantine folder (alias QUARANTINE)";

#[derive(Parser, Debug)]
#[command(name = "visionguard", version)]
#[command(about = "Detect and redact burned-in PHI text in raster and DICOM images")]
#[command(after_help = ACTIONS_HELP)]
pub struct Args {
    /// Directory containing the images to scan
    pub directory: PathBuf,

    /// Redaction action to apply
    #[arg(value_parser = parse_action)]
    pub action: Action,

    /// Directory for redacted images
    pub output_path: PathBuf,

    /// Directory for discrepancy reports
    pub report_path: PathBuf,

    /// Smallest accepted box width in pixels [default: 10]
    #[arg(long = "minWidth", allow_negative_numbers = true)]
    pub min_width: Option<i64>,

    /// Smallest accepted box height in pixels [default: 10]
    #[arg(long = "minHeight", allow_negative_numbers = true)]
    pub min_height: Option<i64>,

    /// Largest accepted box width in pixels [default: 500]
    #[arg(long = "maxWidth", allow_negative_numbers = true)]
    pub max_width: Option<i64>,

    /// Largest accepted box height in pixels [default: 500]
    #[arg(long = "maxHeight", allow_negative_numbers = true)]
    pub max_height: Option<i64>,

    /// Also run the vision-model detector and write discrepancy reports
    #[arg(long, action = ArgAction::Set, value_name = "true|false")]
    pub ollama: Option<bool>,

    /// Quarantine directory for FLAG_FOR_REVIEW [default: <outputPath>/quarantine]
    #[arg(long = "quarantinePath")]
    pub quarantine_path: Option<PathBuf>,

    /// Destination for EXPORT_TO_FOLDER [default: <outputPath>]
    #[arg(long = "moveToFolderPath")]
    pub move_to_path: Option<PathBuf>,

    /// Directory holding the OCR detection and recognition models
    #[arg(long = "ocrModels")]
    pub ocr_models: Option<PathBuf>,

    /// Report whole OCR text lines instead of single words
    #[arg(long = "ocrLines", action = ArgAction::Set, value_name = "true|false")]
    pub ocr_lines: Option<bool>,

    /// Vision-model generate endpoint
    #[arg(long = "ollamaUrl")]
    pub ollama_url: Option<String>,

    /// Vision model name
    #[arg(long = "ollamaModel")]
    pub ollama_model: Option<String>,

    /// Vision-model request timeout in seconds
    #[arg(long = "ollamaTimeout")]
    pub ollama_timeout: Option<u64>,

    /// TrueType font for the review watermark
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// JSON configuration file providing base settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_action(value: &str) -> std::result::Result<Action, String> {
    value.parse::<Action>().map_err(|err| err.to_string())
}

/// Usage line plus the action list, printed when the run aborts.
pub fn usage() -> String {
    let usage = Args::command().render_usage();
    format!("{usage}\n\n{ACTIONS_HELP}\n\nRun with --help for all optional parameters.")
}

impl Args {
    /// Build the run configuration. Threshold problems come back as warnings
    /// (already logged); an unreadable config file is an error.
    pub fn to_config(&self) -> Result<(DetectorConfig, Vec<ConfigWarning>)> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::load(path)?,
            None => DetectorConfig::default(),
        };

        config.output_path = self.output_path.clone();
        if let Some(enabled) = self.ollama {
            config.secondary_enabled = enabled;
        }
        if let Some(path) = &self.quarantine_path {
            config.quarantine_path = Some(path.clone());
        }
        if let Some(path) = &self.move_to_path {
            config.move_to_path = Some(path.clone());
        }
        if let Some(dir) = &self.ocr_models {
            config.ocr_model_dir = Some(dir.clone());
        }
        if let Some(lines) = self.ocr_lines {
            config.line_segmentation = lines;
        }
        if let Some(url) = &self.ollama_url {
            config.inference_url = Some(url.clone());
        }
        if let Some(model) = &self.ollama_model {
            config.inference_model = Some(model.clone());
        }
        if let Some(secs) = self.ollama_timeout {
            config.request_timeout_secs = Some(secs);
        }
        if let Some(font) = &self.font {
            config.font_path = Some(font.clone());
        }

        let warnings = config.apply_thresholds(RawThresholds {
            min_width: self.min_width,
            min_height: self.min_height,
            max_width: self.max_width,
            max_height: self.max_height,
        });
        Ok((config, warnings))
    }
}
