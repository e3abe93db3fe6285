//! Per-experiment outcomes and the batch cycle summary.
//!
//! Each experiment resolves to a tagged outcome, so "one failure doesn't
//! abort the batch" is enforced by the types rather than a catch-all.

use serde::Serialize;

/// Rollout/rollback decision for one evaluated experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Rollout,
    Rollback,
}

/// The measured canary-vs-control comparison behind a decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionMetrics {
    pub canary_mae: f64,
    pub control_mae: f64,
    /// `control_mae - canary_mae`; positive means the canary is better.
    pub mae_improvement: f64,
    pub canary_reliability: f64,
    pub control_reliability: f64,
    /// `canary - control`; positive means the canary is better.
    pub reliability_improvement: f64,
}

/// Why an experiment was left untouched this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Below the minimum evaluation window.
    TooYoung { days_since_start: i64 },
    /// No accuracy records for the canary group over the trailing window.
    NoCanaryData,
    /// No accuracy records for the control group over the trailing window.
    NoControlData,
}

/// Result of one tenant's weight propagation insert.
#[derive(Debug, Clone, Serialize)]
pub struct PropagationOutcome {
    pub tenant_id: String,
    /// `None` on success; the storage error message otherwise.
    pub error: Option<String>,
}

impl PropagationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Best-effort fan-out report: one entry per opted-in tenant, partial
/// success expected and visible.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropagationReport {
    pub outcomes: Vec<PropagationOutcome>,
}

impl PropagationReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Terminal outcome of one experiment for one cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentOutcome {
    /// A decision was reached and applied.
    Evaluated {
        decision: Decision,
        metrics: DecisionMetrics,
        /// Present on rollout only.
        propagation: Option<PropagationReport>,
    },
    /// Insufficient data; the experiment stays `running` for a future cycle.
    Skipped(SkipReason),
    /// Unexpected error; the experiment was moved to `failed`.
    Failed { message: String },
}

/// Summary of one controller cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleSummary {
    /// `(experiment_id, outcome)` in processing order.
    pub outcomes: Vec<(String, ExperimentOutcome)>,
}

impl CycleSummary {
    /// Number of running experiments seen this cycle.
    pub fn experiments_seen(&self) -> usize {
        self.outcomes.len()
    }

    pub fn rolled_out(&self) -> usize {
        self.count_decision(Decision::Rollout)
    }

    pub fn rolled_back(&self) -> usize {
        self.count_decision(Decision::Rollback)
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ExperimentOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ExperimentOutcome::Failed { .. }))
            .count()
    }

    fn count_decision(&self, wanted: Decision) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| {
                matches!(o, ExperimentOutcome::Evaluated { decision, .. } if *decision == wanted)
            })
            .count()
    }
}
