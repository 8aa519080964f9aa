// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Static detector registry, resolved once at startup.

use visionguard_core::{DetectorDefaults, DetectorKind, Result, VisionGuardError};

use crate::detector::TextDetector;
use crate::detector::freetext::FreeTextDetector;
use crate::detector::geometric::GeometricDetector;

/// Builds an unconfigured detector from the run defaults.
pub type DetectorConstructor = fn(&DetectorDefaults) -> Box<dyn TextDetector>;

/// One registered detector.
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    pub name: &'static str,
    pub kind: DetectorKind,
    pub construct: DetectorConstructor,
}

fn geometric(defaults: &DetectorDefaults) -> Box<dyn TextDetector> {
    Box::new(GeometricDetector::new(defaults))
}

fn free_text(defaults: &DetectorDefaults) -> Box<dyn TextDetector> {
    Box::new(FreeTextDetector::new(defaults))
}

static ENTRIES: [RegistryEntry; 2] = [
    RegistryEntry {
        name: GeometricDetector::NAME,
        kind: DetectorKind::Geometric,
        construct: geometric,
    },
    RegistryEntry {
        name: FreeTextDetector::NAME,
        kind: DetectorKind::FreeText,
        construct: free_text,
    },
];

/// Name-to-constructor lookup over the built-in detectors.
pub struct DetectorRegistry;

impl DetectorRegistry {
    pub fn names() -> impl Iterator<Item = &'static str> {
        ENTRIES.iter().map(|entry| entry.name)
    }

    pub fn lookup(name: &str) -> Option<&'static RegistryEntry> {
        ENTRIES
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// The first registered detector of `kind`.
    pub fn first_of(kind: DetectorKind) -> Option<&'static RegistryEntry> {
        ENTRIES.iter().find(|entry| entry.kind == kind)
    }

    /// Construct the detector registered as `name`.
    pub fn create(name: &str, defaults: &DetectorDefaults) -> Result<Box<dyn TextDetector>> {
        let entry = Self::lookup(name).ok_or_else(|| {
            VisionGuardError::Configuration(format!(
                "unknown detector '{name}'; available: {}",
                Self::names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        Ok((entry.construct)(defaults))
    }

    /// Construct the first detector registered for `kind`.
    pub fn create_of_kind(
        kind: DetectorKind,
        defaults: &DetectorDefaults,
    ) -> Result<Box<dyn TextDetector>> {
        let entry = Self::first_of(kind).ok_or_else(|| {
            VisionGuardError::Configuration(format!("no {kind:?} detector is registered"))
        })?;
        Self::create(entry.name, defaults)
    }
}
