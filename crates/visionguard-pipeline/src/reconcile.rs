// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Discrepancy reconciler — cross-checks two detectors' results for one image.
//
// Matching is greedy and one-directional: every region of the primary result
// takes the first secondary candidate (in emission order) that satisfies the
// predicates. Candidates are not consumed, so one candidate may confirm several
// primary regions. Anything the primary found without a match is "missed";
// any candidate never accepted is "mismatched".

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use visionguard_core::{Result, TextRegion, VisionGuardError};

use crate::detection::DetectionResult;

/// Two boxes overlap when their intersection covers more than this share of
/// the smaller box.
pub const OVERLAP_THRESHOLD: f64 = 0.5;

/// Leading phrases vision models wrap their transcriptions in. Compared
/// case-insensitively against whole words.
const BOILERPLATE_PREFIXES: [&str; 10] = [
    "here is",
    "here are",
    "here's",
    "the text",
    "the image",
    "this image",
    "i can see",
    "sure",
    "certainly",
    "of course",
];

/// Intersection over the smaller area. Zero when either box has no area.
pub fn overlap_ratio(a: &TextRegion, b: &TextRegion) -> f64 {
    let smaller = a.area().min(b.area());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection_area(b) as f64 / smaller as f64
}

pub fn overlaps(a: &TextRegion, b: &TextRegion) -> bool {
    overlap_ratio(a, b) > OVERLAP_THRESHOLD
}

/// Case-insensitive equality of trimmed texts. Blank text never matches.
pub fn similar_text(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Whether `fragment` contains the trimmed `text`, ignoring case. Blank text
/// never matches.
pub fn fragment_contains(fragment: &str, text: &str) -> bool {
    let needle = text.trim().to_lowercase();
    !needle.is_empty() && fragment.to_lowercase().contains(&needle)
}

/// Split a free-text response into candidate fragments.
///
/// Lines are trimmed, list markers (`-`, `*`, `•`, `1.`, `2)`) removed, and
/// blank lines and boilerplate lead-ins dropped.
pub fn fragments(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| strip_list_marker(line.trim()).trim())
        .filter(|line| !line.is_empty() && !is_boilerplate(line))
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(|c: char| matches!(c, '-' | '*' | '•')) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return rest;
        }
        return line;
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(|c: char| c == '.' || c == ')') {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest;
            }
        }
    }
    line
}

fn is_boilerplate(line: &str) -> bool {
    let lower = line.to_lowercase();
    BOILERPLATE_PREFIXES.iter().any(|prefix| {
        lower
            .strip_prefix(prefix)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))
    })
}

/// Something the secondary detector reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Region(TextRegion),
    Fragment(String),
}

impl Candidate {
    /// Whether this candidate confirms the primary `region`.
    pub fn confirms(&self, region: &TextRegion) -> bool {
        match self {
            Self::Region(other) => overlaps(region, other) && similar_text(region.text(), other.text()),
            Self::Fragment(fragment) => fragment_contains(fragment, region.text()),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(region) => fmt::Display::fmt(region, f),
            Self::Fragment(text) => write!(f, "Text: {}", text.trim()),
        }
    }
}

/// Whether the two results could be compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    Compared,
    Skipped { reason: String },
}

/// Outcome of reconciling a primary against a secondary result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscrepancyReport {
    pub primary: String,
    pub secondary: String,
    pub status: ReportStatus,
    /// Primary regions nothing in the secondary confirmed.
    pub missed: Vec<TextRegion>,
    /// Secondary candidates no primary region accepted.
    pub mismatched: Vec<Candidate>,
}

impl DiscrepancyReport {
    fn skipped(primary: &str, secondary: &str, reason: impl Into<String>) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            status: ReportStatus::Skipped {
                reason: reason.into(),
            },
            missed: Vec::new(),
            mismatched: Vec::new(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, ReportStatus::Skipped { .. })
    }

    /// Compared and found no discrepancy.
    pub fn is_clean(&self) -> bool {
        !self.is_skipped() && self.missed.is_empty() && self.mismatched.is_empty()
    }

    /// Plain-text rendering written to the report file.
    pub fn render(&self) -> String {
        if let ReportStatus::Skipped { reason } = &self.status {
            return format!(
                "Comparison skipped ({} vs {}): {reason}\n",
                self.primary, self.secondary
            );
        }

        let mut out = format!(
            "Missed Regions (found by {} but not by {}):\n",
            self.primary, self.secondary
        );
        for region in &self.missed {
            out.push_str(&format!("{region}\n"));
        }
        out.push_str(&format!(
            "\nMismatched Regions (found by {} but not by {}):\n",
            self.secondary, self.primary
        ));
        for candidate in &self.mismatched {
            out.push_str(&format!("{candidate}\n"));
        }
        out
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                VisionGuardError::Persist(format!(
                    "cannot create report directory {}: {err}",
                    parent.display()
                ))
            })?;
        }
        std::fs::write(path, self.render()).map_err(|err| {
            VisionGuardError::Persist(format!("failed to write report {}: {err}", path.display()))
        })?;
        info!(
            missed = self.missed.len(),
            mismatched = self.mismatched.len(),
            "Discrepancy report written"
        );
        Ok(())
    }
}

/// `<report_dir>/<file_name>_report.txt`
pub fn report_path(report_dir: &Path, file_name: &str) -> PathBuf {
    report_dir.join(format!("{file_name}_report.txt"))
}

/// Compare `primary` (expected to carry regions) against `secondary`.
pub fn reconcile(primary: &DetectionResult<'_>, secondary: &DetectionResult<'_>) -> DiscrepancyReport {
    let (a_name, b_name) = (primary.detector(), secondary.detector());

    let Some(expected) = primary.regions() else {
        return DiscrepancyReport::skipped(
            a_name,
            b_name,
            format!("{a_name} produced no region list"),
        );
    };

    let candidates: Vec<Candidate> = match (secondary.regions(), secondary.raw_text()) {
        (Some(regions), _) => regions.iter().cloned().map(Candidate::Region).collect(),
        (None, Some(text)) => fragments(text).into_iter().map(Candidate::Fragment).collect(),
        (None, None) => {
            return DiscrepancyReport::skipped(
                a_name,
                b_name,
                format!("{b_name} produced neither regions nor text"),
            );
        }
    };

    let mut accepted = vec![false; candidates.len()];
    let mut missed = Vec::new();
    for region in expected {
        match candidates.iter().position(|c| c.confirms(region)) {
            Some(index) => accepted[index] = true,
            None => missed.push(region.clone()),
        }
    }

    let mismatched: Vec<Candidate> = candidates
        .into_iter()
        .zip(accepted)
        .filter_map(|(candidate, used)| (!used).then_some(candidate))
        .collect();

    debug!(
        expected = expected.len(),
        missed = missed.len(),
        mismatched = mismatched.len(),
        "Results reconciled"
    );
    DiscrepancyReport {
        primary: a_name.to_string(),
        secondary: b_name.to_string(),
        status: ReportStatus::Compared,
        missed,
        mismatched,
    }
}
