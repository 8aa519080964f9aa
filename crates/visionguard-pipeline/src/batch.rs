// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator — runs the detectors and the chosen action over every
// image in a directory.
//
// Processing is sequential and in lexicographic file-name order. Setup
// problems (missing directory, no images, conflicting destinations, a detector
// that was never configured) abort before the first file. After that, every
// error is scoped to the file that caused it: it is logged, recorded in the
// summary, and the loop moves on. Once the primary action has written its
// outputs, a failing secondary action or report write is scoped to that step
// alone: the primary outputs are kept and the remaining steps still run.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument, warn};
use visionguard_core::{Action, DetectorConfig, Result, VisionGuardError};
use visionguard_imaging::{Watermark, codec};

use crate::detector::TextDetector;
use crate::dispatch::ActionDispatcher;
use crate::reconcile::{reconcile, report_path};

/// What to run and where to put the reports.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub directory: PathBuf,
    pub action: Action,
    pub report_dir: PathBuf,
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Totals for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: usize,
    /// Files the primary action was applied to.
    pub processed: usize,
    /// Files where the primary detector found no text.
    pub skipped_without_text: usize,
    /// Failed files and failed steps. A processed file whose secondary action
    /// or report write failed also appears here.
    pub failures: Vec<FileFailure>,
    pub reports_written: usize,
    pub outputs: Vec<PathBuf>,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} files redacted ({} without text, {} failed, {} reports written)",
            self.processed,
            self.total,
            self.skipped_without_text,
            self.failures.len(),
            self.reports_written
        )
    }
}

enum FileOutcome {
    NoText,
    Redacted {
        outputs: Vec<PathBuf>,
        report: Option<PathBuf>,
        step_errors: Vec<VisionGuardError>,
    },
}

/// Drives a primary detector, and optionally a secondary one, over a batch.
pub struct BatchOrchestrator {
    config: DetectorConfig,
    primary: Box<dyn TextDetector>,
    secondary: Option<Box<dyn TextDetector>>,
    dispatcher: ActionDispatcher,
}

impl BatchOrchestrator {
    pub fn new(config: DetectorConfig, primary: Box<dyn TextDetector>, watermark: Watermark) -> Self {
        let dispatcher = ActionDispatcher::new(config.destinations(), watermark);
        Self {
            config,
            primary,
            secondary: None,
            dispatcher,
        }
    }

    /// Register the secondary detector. It only runs when the configuration
    /// enables it.
    pub fn with_secondary(mut self, detector: Box<dyn TextDetector>) -> Self {
        self.secondary = Some(detector);
        self
    }

    fn active_secondary(&self) -> Option<&dyn TextDetector> {
        if self.config.secondary_enabled {
            self.secondary.as_deref()
        } else {
            None
        }
    }

    /// Check everything that must hold before the first file is touched and
    /// return the files to process.
    pub fn preflight(&self, request: &BatchRequest) -> Result<Vec<PathBuf>> {
        if !request.directory.is_dir() {
            return Err(VisionGuardError::Configuration(format!(
                "{} is not a directory",
                request.directory.display()
            )));
        }

        self.config.validate_for(request.action)?;

        if !self.primary.is_ready() {
            return Err(VisionGuardError::Configuration(format!(
                "detector {} is not ready",
                self.primary.name()
            )));
        }
        if self.config.secondary_enabled {
            match &self.secondary {
                None => {
                    return Err(VisionGuardError::Configuration(
                        "secondary detection is enabled but no secondary detector is registered"
                            .into(),
                    ));
                }
                Some(detector) if !detector.is_ready() => {
                    return Err(VisionGuardError::Configuration(format!(
                        "detector {} is not ready",
                        detector.name()
                    )));
                }
                Some(_) => {}
            }
        }

        let files = collect_images(&request.directory)?;
        if files.is_empty() {
            return Err(VisionGuardError::Configuration(format!(
                "no supported image files in {}",
                request.directory.display()
            )));
        }
        Ok(files)
    }

    /// Process every image in the request directory.
    ///
    /// Only setup problems are returned as errors; per-file failures end up in
    /// the summary.
    #[instrument(skip_all, fields(dir = %request.directory.display(), action = %request.action))]
    pub fn run(&self, request: &BatchRequest) -> Result<BatchSummary> {
        let files = self.preflight(request)?;
        let mut summary = BatchSummary {
            total: files.len(),
            ..Default::default()
        };
        info!(
            files = files.len(),
            primary = self.primary.name(),
            secondary = self.active_secondary().map(|d| d.name()),
            "Batch started"
        );

        for (index, path) in files.iter().enumerate() {
            let name = file_name(path);
            info!(file = %name, "[{}/{}] Processing", index + 1, files.len());

            match self.process_file(path, &name, request) {
                Ok(FileOutcome::NoText) => {
                    info!(file = %name, "No text detected; nothing to redact");
                    summary.skipped_without_text += 1;
                }
                Ok(FileOutcome::Redacted {
                    outputs,
                    report,
                    step_errors,
                }) => {
                    summary.processed += 1;
                    summary.outputs.extend(outputs);
                    if report.is_some() {
                        summary.reports_written += 1;
                    }
                    for err in step_errors {
                        error!(file = %name, %err, "Step failed; primary outputs kept");
                        summary.failures.push(FileFailure {
                            file: name.clone(),
                            error: err.to_string(),
                        });
                    }
                }
                Err(err) => {
                    error!(file = %name, %err, "File failed; continuing with the next one");
                    summary.failures.push(FileFailure {
                        file: name,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(%summary, "Batch finished");
        Ok(summary)
    }

    fn process_file(&self, path: &Path, name: &str, request: &BatchRequest) -> Result<FileOutcome> {
        let buffer = codec::decode(path)?;

        let primary = self.primary.detect(&buffer);
        if primary.is_empty() {
            return Ok(FileOutcome::NoText);
        }
        debug!(file = %name, regions = primary.region_count(), "Primary detection done");

        let secondary = self
            .active_secondary()
            .map(|detector| (detector, detector.detect(&buffer)));

        let mut outputs =
            self.primary
                .apply_action(request.action, &primary, &self.dispatcher, name)?;

        let mut step_errors = Vec::new();
        if let Some((detector, result)) = &secondary {
            if detector.supports(request.action) {
                match detector.apply_action(request.action, result, &self.dispatcher, name) {
                    Ok(written) => outputs.extend(written),
                    Err(err) => step_errors.push(err),
                }
            } else {
                debug!(
                    detector = detector.name(),
                    action = %request.action,
                    "Secondary detector cannot apply this action; skipped"
                );
            }
        }

        let report = match &secondary {
            Some((_, result)) => {
                let path = report_path(&request.report_dir, name);
                match reconcile(&primary, result).write_to(&path) {
                    Ok(()) => Some(path),
                    Err(err) => {
                        step_errors.push(err);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(FileOutcome::Redacted {
            outputs,
            report,
            step_errors,
        })
    }
}

/// Supported images directly inside `dir`, sorted by file name.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        VisionGuardError::Configuration(format!("cannot read directory {}: {err}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && codec::classify(&path).is_some() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
