//! The evaluation & rollout control loop.

use std::sync::Arc;

use calibra_core::config::RolloutPolicy;
use calibra_core::errors::ControllerError;
use calibra_core::time::{unix_now, SECS_PER_DAY};
use calibra_core::traits::storage::{
    ExperimentRow, IAccuracyStore, IEnsembleStore, IExperimentStore, IReliabilitySource,
    ITenantSettings, IWeightLedger, WeightVectorRow,
};
use calibra_core::types::experiment::ExperimentStatus;
use calibra_core::{FxHashSet, ENSEMBLE_FAMILY};
use tracing::{debug, error, info, warn};

use crate::outcome::{
    CycleSummary, Decision, DecisionMetrics, ExperimentOutcome, PropagationOutcome,
    PropagationReport, SkipReason,
};
use crate::stats;

/// Apply the rollout decision rule. The two thresholds are independent and
/// OR-ed; MAE is checked first. Either signal alone approves the rollout.
pub fn decide(policy: &RolloutPolicy, metrics: &DecisionMetrics) -> Decision {
    if metrics.mae_improvement >= policy.mae_threshold
        || metrics.reliability_improvement >= policy.reliability_threshold
    {
        Decision::Rollout
    } else {
        Decision::Rollback
    }
}

/// Canary/control tenant partition for one experiment.
///
/// The named population policy: control is every tenant that has a
/// settings row, minus the canary group. Tenants without a settings row
/// belong to neither group and never receive propagated weights.
struct Partition {
    canary: Vec<String>,
    control: Vec<String>,
    /// Tenants with `self_tuning_enabled`, canary members included — the
    /// propagation targets on rollout.
    opted_in: Vec<String>,
}

/// The periodic evaluation & rollout controller.
///
/// Stateless between cycles; every invocation re-reads the registry. Only
/// experiments in the `ensemble` family and status `running` are touched,
/// and each is moved to at most one terminal state.
pub struct RolloutController {
    store: Arc<dyn IEnsembleStore>,
    policy: RolloutPolicy,
}

impl RolloutController {
    pub fn new(store: Arc<dyn IEnsembleStore>, policy: RolloutPolicy) -> Self {
        Self { store, policy }
    }

    /// Run one evaluation cycle at the current wall-clock time.
    pub fn run_cycle(&self) -> Result<CycleSummary, ControllerError> {
        self.run_cycle_at(unix_now())
    }

    /// Run one evaluation cycle at an explicit timestamp.
    ///
    /// Failing to list the running experiments is a batch-level error and
    /// mutates nothing. Every other failure is absorbed into the affected
    /// experiment's outcome; the loop always reaches the last experiment.
    pub fn run_cycle_at(&self, now: i64) -> Result<CycleSummary, ControllerError> {
        let experiments = self.store.query_running_experiments(ENSEMBLE_FAMILY)?;
        debug!(count = experiments.len(), "scanning running ensemble experiments");

        let mut summary = CycleSummary::default();
        for experiment in &experiments {
            let outcome = match self.evaluate_experiment(experiment, now) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(experiment = %experiment.id, error = %e, "experiment evaluation failed");
                    let notes = format!("evaluation failed: {e}");
                    if let Err(write_err) = self.store.complete_experiment(
                        &experiment.id,
                        ExperimentStatus::Failed,
                        now,
                        &notes,
                    ) {
                        error!(
                            experiment = %experiment.id,
                            error = %write_err,
                            "could not record failed status; experiment stays running"
                        );
                    }
                    ExperimentOutcome::Failed { message: e.to_string() }
                }
            };
            summary.outcomes.push((experiment.id.clone(), outcome));
        }

        info!(
            seen = summary.experiments_seen(),
            rolled_out = summary.rolled_out(),
            rolled_back = summary.rolled_back(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "evaluation cycle complete"
        );
        Ok(summary)
    }

    fn evaluate_experiment(
        &self,
        experiment: &ExperimentRow,
        now: i64,
    ) -> Result<ExperimentOutcome, ControllerError> {
        // Maturity gate: no decisions on statistically thin samples.
        if now - experiment.started_at < self.policy.min_eval_window_secs() {
            let days_since_start = (now - experiment.started_at) / SECS_PER_DAY;
            debug!(experiment = %experiment.id, days_since_start, "experiment too young, skipping");
            return Ok(ExperimentOutcome::Skipped(SkipReason::TooYoung { days_since_start }));
        }

        let partition = self.partition(&experiment.id)?;

        let since = now - self.policy.metric_window_secs();
        let canary_accuracy = self.store.query_accuracy_since(&partition.canary, since)?;
        let control_accuracy = self.store.query_accuracy_since(&partition.control, since)?;

        let Some(canary_mae) = stats::mean_absolute_error(&canary_accuracy) else {
            debug!(experiment = %experiment.id, "no canary accuracy data, skipping");
            return Ok(ExperimentOutcome::Skipped(SkipReason::NoCanaryData));
        };
        let Some(control_mae) = stats::mean_absolute_error(&control_accuracy) else {
            debug!(experiment = %experiment.id, "no control accuracy data, skipping");
            return Ok(ExperimentOutcome::Skipped(SkipReason::NoControlData));
        };

        let canary_reliability =
            stats::average_reliability(&self.store.latest_reliability(&partition.canary)?);
        let control_reliability =
            stats::average_reliability(&self.store.latest_reliability(&partition.control)?);

        let metrics = DecisionMetrics {
            canary_mae,
            control_mae,
            mae_improvement: control_mae - canary_mae,
            canary_reliability,
            control_reliability,
            reliability_improvement: canary_reliability - control_reliability,
        };

        match decide(&self.policy, &metrics) {
            Decision::Rollout => self.roll_out(experiment, &partition, now, metrics),
            Decision::Rollback => self.roll_back(experiment, now, metrics),
        }
    }

    fn partition(&self, experiment_id: &str) -> Result<Partition, ControllerError> {
        let canary = self.store.query_assignments(experiment_id)?;
        let canary_set: FxHashSet<&str> = canary.iter().map(String::as_str).collect();

        let settings = self.store.query_tenant_settings()?;
        let control = settings
            .iter()
            .filter(|s| !canary_set.contains(s.tenant_id.as_str()))
            .map(|s| s.tenant_id.clone())
            .collect();
        let opted_in = settings
            .iter()
            .filter(|s| s.self_tuning_enabled)
            .map(|s| s.tenant_id.clone())
            .collect();

        Ok(Partition { canary, control, opted_in })
    }

    /// Promote the canary's newest weight vector to every opted-in tenant
    /// and close the experiment as `succeeded`.
    fn roll_out(
        &self,
        experiment: &ExperimentRow,
        partition: &Partition,
        now: i64,
        metrics: DecisionMetrics,
    ) -> Result<ExperimentOutcome, ControllerError> {
        // The single most recent tuning result anywhere in the canary
        // group — never an average.
        let vector = self
            .store
            .latest_weight_vector_among(&partition.canary)?
            .ok_or_else(|| ControllerError::MissingCanaryVector {
                experiment_id: experiment.id.clone(),
            })?;

        let report = self.propagate(&vector, &partition.opted_in, now);

        let notes = format!(
            "rollout approved: mae improvement {:.4} (threshold {:.4}), \
             reliability improvement {:.4} (threshold {:.4}); \
             weights propagated to {}/{} opted-in tenants",
            metrics.mae_improvement,
            self.policy.mae_threshold,
            metrics.reliability_improvement,
            self.policy.reliability_threshold,
            report.succeeded(),
            report.attempted(),
        );
        self.store
            .complete_experiment(&experiment.id, ExperimentStatus::Succeeded, now, &notes)?;

        info!(
            experiment = %experiment.id,
            source_tenant = %vector.tenant_id,
            propagated = report.succeeded(),
            attempted = report.attempted(),
            mae_improvement = metrics.mae_improvement,
            reliability_improvement = metrics.reliability_improvement,
            "canary rollout approved"
        );
        Ok(ExperimentOutcome::Evaluated {
            decision: Decision::Rollout,
            metrics,
            propagation: Some(report),
        })
    }

    /// Best-effort fan-out: one independent insert per tenant. A failed
    /// insert is recorded and logged but blocks neither the remaining
    /// tenants nor the experiment's transition.
    fn propagate(
        &self,
        vector: &WeightVectorRow,
        tenant_ids: &[String],
        now: i64,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        for tenant_id in tenant_ids {
            let row = WeightVectorRow {
                tenant_id: tenant_id.clone(),
                weight_arima: vector.weight_arima,
                weight_gradient: vector.weight_gradient,
                weight_bayes: vector.weight_bayes,
                reliability: vector.reliability,
                mae: vector.mae,
                adjusted_at: now,
            };
            let error = match self.store.append_weight_vector(&row) {
                Ok(()) => None,
                Err(e) => {
                    warn!(tenant = %tenant_id, error = %e, "weight propagation failed");
                    Some(e.to_string())
                }
            };
            report.outcomes.push(PropagationOutcome {
                tenant_id: tenant_id.clone(),
                error,
            });
        }
        report
    }

    /// Discard the canary vector: close the experiment as `rolled_back`
    /// and leave the population untouched.
    fn roll_back(
        &self,
        experiment: &ExperimentRow,
        now: i64,
        metrics: DecisionMetrics,
    ) -> Result<ExperimentOutcome, ControllerError> {
        let notes = format!(
            "rolled back: mae improvement {:.4} below threshold {:.4}, \
             reliability improvement {:.4} below threshold {:.4}",
            metrics.mae_improvement,
            self.policy.mae_threshold,
            metrics.reliability_improvement,
            self.policy.reliability_threshold,
        );
        self.store
            .complete_experiment(&experiment.id, ExperimentStatus::RolledBack, now, &notes)?;

        info!(
            experiment = %experiment.id,
            mae_improvement = metrics.mae_improvement,
            reliability_improvement = metrics.reliability_improvement,
            "canary rolled back"
        );
        Ok(ExperimentOutcome::Evaluated {
            decision: Decision::Rollback,
            metrics,
            propagation: None,
        })
    }
}
