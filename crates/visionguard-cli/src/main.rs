// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// VisionGuard — batch PHI text detection and redaction.
//
// Entry point. Initialises logging, builds the configuration from flags,
// resolves and configures the detectors, and runs the batch.

mod args;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use visionguard_core::{DetectorConfig, DetectorKind, Result};
use visionguard_imaging::{Watermark, default_model_dir};
use visionguard_pipeline::{
    BatchOrchestrator, BatchRequest, BatchSummary, DetectorRegistry, TextDetector,
};

use args::{Args, usage};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(action = %args.action, dir = %args.directory.display(), "VisionGuard starting");

    match run(&args) {
        Ok(summary) => {
            for failure in &summary.failures {
                eprintln!("failed: {}: {}", failure.file, failure.error);
            }
            println!("Processing completed: {summary}");
            println!("Output saved to: {}", args.output_path.display());
            if summary.reports_written > 0 {
                println!("Discrepancy reports saved to: {}", args.report_path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "VisionGuard aborted");
            eprintln!("error: {err}\n\n{}", usage());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<BatchSummary> {
    let (config, _warnings) = args.to_config()?;
    config.validate_for(args.action)?;

    let primary = geometric_detector(&config)?;
    let watermark = Watermark::load(config.font_path.as_deref());
    let mut orchestrator = BatchOrchestrator::new(config.clone(), primary, watermark);
    if config.secondary_enabled {
        orchestrator = orchestrator.with_secondary(free_text_detector(&config)?);
    }

    orchestrator.run(&BatchRequest {
        directory: args.directory.clone(),
        action: args.action,
        report_dir: args.report_path.clone(),
    })
}

fn geometric_detector(config: &DetectorConfig) -> Result<Box<dyn TextDetector>> {
    let mut detector =
        DetectorRegistry::create_of_kind(DetectorKind::Geometric, &config.detector_defaults())?;
    detector.initialize(config)?;

    let model_dir = config
        .ocr_model_dir
        .clone()
        .unwrap_or_else(default_model_dir)
        .to_string_lossy()
        .into_owned();
    detector.configure(&[model_dir.as_str()])?;
    Ok(detector)
}

fn free_text_detector(config: &DetectorConfig) -> Result<Box<dyn TextDetector>> {
    let defaults = config.detector_defaults();
    let mut detector = DetectorRegistry::create_of_kind(DetectorKind::FreeText, &defaults)?;
    // Timeout first: `configure` builds the HTTP client with it.
    detector.initialize(config)?;
    detector.configure(&[
        defaults.inference_url.as_str(),
        defaults.inference_model.as_str(),
    ])?;
    Ok(detector)
}
