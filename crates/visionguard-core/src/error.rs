// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for VisionGuard.

use thiserror::Error;

use crate::types::Action;

/// Top-level error type for all VisionGuard operations.
#[derive(Debug, Error)]
pub enum VisionGuardError {
    // -- Setup --
    #[error("configuration error: {0}")]
    Configuration(String),

    // -- Per-file --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("text detection failed: {0}")]
    Detection(String),

    #[error("action {action} is not supported by the {detector} detector")]
    UnsupportedAction { detector: String, action: Action },

    #[error("failed to persist output: {0}")]
    Persist(String),

    // -- Storage / serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VisionGuardError {
    /// Whether this error aborts a whole batch rather than a single file.
    ///
    /// Only configuration problems are fatal; everything else is scoped to the
    /// file (or the single dispatch) that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VisionGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_errors_are_fatal() {
        assert!(VisionGuardError::Configuration("x".into()).is_fatal());
        assert!(!VisionGuardError::Decode("x".into()).is_fatal());
        assert!(!VisionGuardError::Persist("x".into()).is_fatal());
        assert!(
            !VisionGuardError::UnsupportedAction {
                detector: "ollama".into(),
                action: Action::Mask,
            }
            .is_fatal()
        );
    }

    #[test]
    fn unsupported_action_message_names_detector_and_action() {
        let err = VisionGuardError::UnsupportedAction {
            detector: "ollama".into(),
            action: Action::Burn,
        };
        assert_eq!(
            err.to_string(),
            "action BURN is not supported by the ollama detector"
        );
    }
}
