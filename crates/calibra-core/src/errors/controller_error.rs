//! Rollout-controller errors.
//!
//! Per-experiment variants never escape a controller cycle; they are
//! absorbed into the experiment's `failed` terminal state. Only batch-level
//! failures (listing the running experiments) reach the caller.

use super::error_code::{self, CalibraErrorCode};

/// Errors raised while evaluating canary experiments.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Storage error: {0}")]
    Storage(#[from] super::StorageError),

    #[error("No weight vector found in the canary group of experiment {experiment_id}")]
    MissingCanaryVector { experiment_id: String },
}

impl CalibraErrorCode for ControllerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.error_code(),
            Self::MissingCanaryVector { .. } => error_code::MISSING_CANARY_VECTOR,
        }
    }
}
