// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// visionguard-pipeline — Detection and redaction pipeline for VisionGuard.
//
// Hosts the two text detectors (OCR-backed geometric detector and the
// free-text vision-model detector), the static detector registry, the action
// dispatcher, the discrepancy reconciler, and the batch orchestrator that
// drives them over a directory of images.

pub mod batch;
pub mod detection;
pub mod detector;
pub mod dispatch;
pub mod reconcile;
pub mod registry;

pub use batch::{BatchOrchestrator, BatchRequest, BatchSummary, FileFailure};
pub use detection::DetectionResult;
pub use detector::TextDetector;
pub use detector::freetext::{FreeTextDetector, InferenceClient, OllamaClient};
pub use detector::geometric::GeometricDetector;
pub use dispatch::ActionDispatcher;
pub use reconcile::{Candidate, DiscrepancyReport, reconcile};
pub use registry::DetectorRegistry;
