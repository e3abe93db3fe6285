//! # calibra-core
//!
//! Foundation crate for the Calibra forecast-tuning service.
//! Defines the storage traits and row types, errors, config, and tracing
//! setup shared by the persistence layer and the rollout controller.

pub mod config;
pub mod errors;
pub mod time;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::{CalibraConfig, RolloutPolicy};
pub use errors::error_code::CalibraErrorCode;
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::experiment::{ExperimentStatus, ENSEMBLE_FAMILY};
