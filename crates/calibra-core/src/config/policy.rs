//! Rollout policy constants.
//!
//! Every threshold the controller consults lives here, so tests can
//! exercise boundary values directly instead of patching literals.

use serde::{Deserialize, Serialize};

use crate::time::SECS_PER_DAY;

/// Policy constants for canary evaluation and rollout decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutPolicy {
    /// Minimum age of an experiment, in days, before it is evaluated at all.
    /// Younger experiments are skipped without a state change.
    pub min_eval_window_days: i64,
    /// Trailing window, in days, over which accuracy records are aggregated.
    pub metric_window_days: i64,
    /// Minimum MAE improvement (control MAE minus canary MAE, percentage
    /// points) that alone approves a rollout.
    pub mae_threshold: f64,
    /// Minimum reliability improvement (canary minus control, percentage
    /// points) that alone approves a rollout.
    pub reliability_threshold: f64,
}

impl Default for RolloutPolicy {
    fn default() -> Self {
        Self {
            min_eval_window_days: 3,
            metric_window_days: 3,
            mae_threshold: 0.5,
            reliability_threshold: 5.0,
        }
    }
}

impl RolloutPolicy {
    /// Minimum evaluation window in unix seconds.
    pub fn min_eval_window_secs(&self) -> i64 {
        self.min_eval_window_days * SECS_PER_DAY
    }

    /// Trailing metric window in unix seconds.
    pub fn metric_window_secs(&self) -> i64 {
        self.metric_window_days * SECS_PER_DAY
    }
}
