//! End-to-end controller scenarios against an in-memory database:
//! maturity gate, insufficient-data skips, both decision paths, weight
//! propagation, and per-experiment failure isolation.

use std::sync::Arc;

use calibra_controller::{Decision, ExperimentOutcome, RolloutController, SkipReason};
use calibra_core::config::RolloutPolicy;
use calibra_core::errors::StorageError;
use calibra_core::traits::storage::{
    AccuracyRow, ExperimentRow, IAccuracyStore, IExperimentStore, IReliabilitySource,
    ITenantSettings, IWeightLedger, ReliabilityRow, TenantSettingRow, WeightVectorRow,
};
use calibra_core::types::experiment::ExperimentStatus;
use calibra_core::ENSEMBLE_FAMILY;
use calibra_storage::CalibraStorageEngine;

const DAY: i64 = 86_400;
const NOW: i64 = 1_700_000_000;

fn engine() -> Arc<CalibraStorageEngine> {
    Arc::new(CalibraStorageEngine::open_in_memory().unwrap())
}

fn controller(store: Arc<CalibraStorageEngine>) -> RolloutController {
    RolloutController::new(store, RolloutPolicy::default())
}

fn seed_tenant(store: &CalibraStorageEngine, id: &str, enabled: bool) {
    store.upsert_tenant_setting(id, enabled).unwrap();
}

fn seed_accuracy(store: &CalibraStorageEngine, tenant: &str, date: i64, predicted: f64, actual: f64) {
    store
        .record_accuracy(&AccuracyRow {
            tenant_id: tenant.to_string(),
            evaluation_date: date,
            predicted_success_rate: predicted,
            actual_success_rate: actual,
        })
        .unwrap();
}

fn seed_weight(store: &CalibraStorageEngine, tenant: &str, arima: f64, reliability: f64, adjusted_at: i64) {
    store
        .append_weight_vector(&WeightVectorRow {
            tenant_id: tenant.to_string(),
            weight_arima: arima,
            weight_gradient: 0.3,
            weight_bayes: 0.2,
            reliability,
            mae: 3.0,
            adjusted_at,
        })
        .unwrap();
}

fn seed_experiment(store: &CalibraStorageEngine, id: &str, started_at: i64, canary: &[&str]) {
    store
        .create_experiment(&ExperimentRow {
            id: id.to_string(),
            family: ENSEMBLE_FAMILY.to_string(),
            status: ExperimentStatus::Running,
            started_at,
            finished_at: None,
            notes: None,
        })
        .unwrap();
    let tenants: Vec<String> = canary.iter().map(|t| t.to_string()).collect();
    store.assign_tenants(id, &tenants).unwrap();
}

fn status_of(store: &CalibraStorageEngine, id: &str) -> ExperimentStatus {
    store.query_experiment(id).unwrap().unwrap().status
}

fn ledger_rows_at(store: &CalibraStorageEngine, tenant: &str, adjusted_at: i64) -> usize {
    store
        .query_weight_history(tenant, 100)
        .unwrap()
        .iter()
        .filter(|r| r.adjusted_at == adjusted_at)
        .count()
}

/// Canary `t-canary` vs control `t-control`, both with accuracy inside the
/// trailing window. MAE diff and reliabilities are caller-controlled.
fn seed_comparison(
    store: &CalibraStorageEngine,
    canary_error: f64,
    control_error: f64,
    canary_reliability: f64,
    control_reliability: f64,
) {
    seed_tenant(store, "t-canary", true);
    seed_tenant(store, "t-control", true);
    seed_accuracy(store, "t-canary", NOW - DAY, 90.0, 90.0 - canary_error);
    seed_accuracy(store, "t-control", NOW - DAY, 90.0, 90.0 - control_error);
    seed_weight(store, "t-canary", 0.5, canary_reliability, NOW - DAY);
    seed_weight(store, "t-control", 0.4, control_reliability, NOW - DAY);
}

// ═══════════════════════════════════════════════════════════════════════════
// MATURITY GATE & INSUFFICIENT DATA
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn young_experiment_is_left_untouched() {
    let store = engine();
    seed_comparison(&store, 3.5, 4.2, 80.0, 80.0);
    seed_experiment(&store, "exp-young", NOW - DAY, &["t-canary"]);

    let summary = controller(store.clone()).run_cycle_at(NOW).unwrap();

    assert_eq!(summary.experiments_seen(), 1);
    assert!(matches!(
        summary.outcomes[0].1,
        ExperimentOutcome::Skipped(SkipReason::TooYoung { days_since_start: 1 })
    ));
    assert_eq!(status_of(&store, "exp-young"), ExperimentStatus::Running);
    // No propagation writes either.
    assert_eq!(ledger_rows_at(&store, "t-canary", NOW), 0);
}

#[test]
fn empty_canary_window_skips_without_transition() {
    let store = engine();
    seed_tenant(&store, "t-canary", true);
    seed_tenant(&store, "t-control", true);
    // Control has data, the canary has none over the window.
    seed_accuracy(&store, "t-control", NOW - DAY, 90.0, 86.0);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    let summary = controller(store.clone()).run_cycle_at(NOW).unwrap();

    assert!(matches!(
        summary.outcomes[0].1,
        ExperimentOutcome::Skipped(SkipReason::NoCanaryData)
    ));
    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Running);
}

#[test]
fn empty_control_window_skips_without_transition() {
    let store = engine();
    seed_tenant(&store, "t-canary", true);
    seed_tenant(&store, "t-control", true);
    seed_accuracy(&store, "t-canary", NOW - DAY, 90.0, 86.0);
    // Accuracy older than the trailing window does not count.
    seed_accuracy(&store, "t-control", NOW - 30 * DAY, 90.0, 86.0);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    let summary = controller(store.clone()).run_cycle_at(NOW).unwrap();

    assert!(matches!(
        summary.outcomes[0].1,
        ExperimentOutcome::Skipped(SkipReason::NoControlData)
    ));
    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Running);
}

// ═══════════════════════════════════════════════════════════════════════════
// DECISION PATHS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn mae_improvement_alone_approves_rollout() {
    let store = engine();
    // Control MAE 4.2, canary 3.5 → improvement 0.7 ≥ 0.5.
    // Reliability is worse for the canary and must not matter.
    seed_comparison(&store, 3.5, 4.2, 70.0, 80.0);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    let summary = controller(store.clone()).run_cycle_at(NOW).unwrap();

    match &summary.outcomes[0].1 {
        ExperimentOutcome::Evaluated { decision, metrics, propagation } => {
            assert_eq!(*decision, Decision::Rollout);
            assert!((metrics.mae_improvement - 0.7).abs() < 1e-9);
            assert_eq!(propagation.as_ref().unwrap().succeeded(), 2);
        }
        other => panic!("expected an evaluated outcome, got {other:?}"),
    }

    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Succeeded);
    let row = store.query_experiment("exp-1").unwrap().unwrap();
    assert_eq!(row.finished_at, Some(NOW));
    assert!(row.notes.unwrap().contains("rollout approved"));

    // Exactly one fresh ledger row per opted-in tenant, canary included.
    assert_eq!(ledger_rows_at(&store, "t-canary", NOW), 1);
    assert_eq!(ledger_rows_at(&store, "t-control", NOW), 1);
}

#[test]
fn reliability_improvement_alone_approves_rollout() {
    let store = engine();
    // MAE barely moves (0.1 < 0.5) but reliability jumps by 10 ≥ 5.
    seed_comparison(&store, 3.9, 4.0, 90.0, 80.0);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    let summary = controller(store.clone()).run_cycle_at(NOW).unwrap();

    match &summary.outcomes[0].1 {
        ExperimentOutcome::Evaluated { decision, .. } => assert_eq!(*decision, Decision::Rollout),
        other => panic!("expected an evaluated outcome, got {other:?}"),
    }
    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Succeeded);
}

#[test]
fn mae_improvement_exactly_at_threshold_rolls_out() {
    let store = engine();
    // 4.0 - 3.5 = 0.5, and the rule is >=.
    seed_comparison(&store, 3.5, 4.0, 80.0, 80.0);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    controller(store.clone()).run_cycle_at(NOW).unwrap();
    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Succeeded);
}

#[test]
fn neither_threshold_met_rolls_back_without_writes() {
    let store = engine();
    // MAE improvement 0.1 < 0.5; reliability improvement 4 < 5.
    seed_comparison(&store, 3.9, 4.0, 84.0, 80.0);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    let summary = controller(store.clone()).run_cycle_at(NOW).unwrap();

    match &summary.outcomes[0].1 {
        ExperimentOutcome::Evaluated { decision, metrics, propagation } => {
            assert_eq!(*decision, Decision::Rollback);
            assert!((metrics.reliability_improvement - 4.0).abs() < 1e-9);
            assert!(propagation.is_none());
        }
        other => panic!("expected an evaluated outcome, got {other:?}"),
    }

    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::RolledBack);
    let notes = store.query_experiment("exp-1").unwrap().unwrap().notes.unwrap();
    assert!(notes.contains("rolled back"));
    assert!(notes.contains("0.5000"));
    assert!(notes.contains("5.0000"));

    assert_eq!(ledger_rows_at(&store, "t-canary", NOW), 0);
    assert_eq!(ledger_rows_at(&store, "t-control", NOW), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPAGATION SEMANTICS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn rollout_copies_the_newest_canary_vector_verbatim() {
    let store = engine();
    seed_tenant(&store, "c1", true);
    seed_tenant(&store, "c2", true);
    seed_tenant(&store, "t-control", true);
    seed_accuracy(&store, "c1", NOW - DAY, 90.0, 86.5);
    seed_accuracy(&store, "t-control", NOW - DAY, 90.0, 85.8);

    seed_weight(&store, "c1", 0.10, 80.0, NOW - 5 * DAY);
    seed_weight(&store, "c2", 0.55, 80.0, NOW - 2 * DAY);
    // A newer control-group vector must never be the rollout source.
    seed_weight(&store, "t-control", 0.99, 80.0, NOW - DAY);

    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["c1", "c2"]);
    controller(store.clone()).run_cycle_at(NOW).unwrap();

    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Succeeded);
    for tenant in ["c1", "c2", "t-control"] {
        let newest = &store.query_weight_history(tenant, 1).unwrap()[0];
        assert_eq!(newest.adjusted_at, NOW);
        assert!(
            (newest.weight_arima - 0.55).abs() < 1e-10,
            "tenant {tenant} should carry the newest canary vector"
        );
    }
}

#[test]
fn opted_out_tenants_receive_nothing() {
    let store = engine();
    seed_comparison(&store, 3.5, 4.2, 80.0, 80.0);
    seed_tenant(&store, "t-opted-out", false);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    controller(store.clone()).run_cycle_at(NOW).unwrap();

    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Succeeded);
    assert_eq!(ledger_rows_at(&store, "t-opted-out", NOW), 0);
    assert_eq!(ledger_rows_at(&store, "t-canary", NOW), 1);
}

#[test]
fn one_tenant_insert_failure_does_not_block_the_rest() {
    let store = engine();
    seed_comparison(&store, 3.5, 4.2, 80.0, 80.0);
    seed_tenant(&store, "t-third", true);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    let failing = Arc::new(FailingStore {
        inner: store.clone(),
        poison_accuracy_tenant: None,
        poison_append_tenant: Some("t-control".to_string()),
    });
    let summary = RolloutController::new(failing, RolloutPolicy::default())
        .run_cycle_at(NOW)
        .unwrap();

    match &summary.outcomes[0].1 {
        ExperimentOutcome::Evaluated { decision, propagation, .. } => {
            assert_eq!(*decision, Decision::Rollout);
            let report = propagation.as_ref().unwrap();
            assert_eq!(report.attempted(), 3);
            assert_eq!(report.succeeded(), 2);
            assert_eq!(report.failed(), 1);
        }
        other => panic!("expected an evaluated outcome, got {other:?}"),
    }

    // The experiment still completes, and the healthy tenants got rows.
    assert_eq!(status_of(&store, "exp-1"), ExperimentStatus::Succeeded);
    assert_eq!(ledger_rows_at(&store, "t-canary", NOW), 1);
    assert_eq!(ledger_rows_at(&store, "t-third", NOW), 1);
    assert_eq!(ledger_rows_at(&store, "t-control", NOW), 0);
    let notes = store.query_experiment("exp-1").unwrap().unwrap().notes.unwrap();
    assert!(notes.contains("2/3"));
}

// ═══════════════════════════════════════════════════════════════════════════
// ISOLATION & IDEMPOTENCE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn failure_in_one_experiment_leaves_the_next_fully_evaluated() {
    let store = engine();
    seed_comparison(&store, 3.5, 4.2, 80.0, 80.0);
    // t-poison has no settings row, so it is in neither control group.
    // exp-a is older, so it is processed first.
    seed_experiment(&store, "exp-a", NOW - 20 * DAY, &["t-poison"]);
    seed_experiment(&store, "exp-b", NOW - 10 * DAY, &["t-canary"]);

    let failing = Arc::new(FailingStore {
        inner: store.clone(),
        poison_accuracy_tenant: Some("t-poison".to_string()),
        poison_append_tenant: None,
    });
    let summary = RolloutController::new(failing, RolloutPolicy::default())
        .run_cycle_at(NOW)
        .unwrap();

    assert_eq!(summary.experiments_seen(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.rolled_out(), 1);

    assert_eq!(status_of(&store, "exp-a"), ExperimentStatus::Failed);
    let notes = store.query_experiment("exp-a").unwrap().unwrap().notes.unwrap();
    assert!(notes.contains("evaluation failed"));

    assert_eq!(status_of(&store, "exp-b"), ExperimentStatus::Succeeded);
}

#[test]
fn second_cycle_sees_no_terminal_experiments() {
    let store = engine();
    seed_comparison(&store, 3.9, 4.0, 84.0, 80.0);
    seed_experiment(&store, "exp-1", NOW - 10 * DAY, &["t-canary"]);

    let ctl = controller(store.clone());
    let first = ctl.run_cycle_at(NOW).unwrap();
    assert_eq!(first.experiments_seen(), 1);
    let notes_after_first = store.query_experiment("exp-1").unwrap().unwrap().notes;

    let second = ctl.run_cycle_at(NOW + DAY).unwrap();
    assert_eq!(second.experiments_seen(), 0);

    // Terminal fields did not flap.
    let row = store.query_experiment("exp-1").unwrap().unwrap();
    assert_eq!(row.status, ExperimentStatus::RolledBack);
    assert_eq!(row.finished_at, Some(NOW));
    assert_eq!(row.notes, notes_after_first);
}

#[test]
fn other_experiment_families_are_ignored() {
    let store = engine();
    seed_comparison(&store, 3.5, 4.2, 80.0, 80.0);
    store
        .create_experiment(&ExperimentRow {
            id: "exp-pricing".to_string(),
            family: "pricing".to_string(),
            status: ExperimentStatus::Running,
            started_at: NOW - 30 * DAY,
            finished_at: None,
            notes: None,
        })
        .unwrap();

    let summary = controller(store.clone()).run_cycle_at(NOW).unwrap();
    assert_eq!(summary.experiments_seen(), 0);
    assert_eq!(status_of(&store, "exp-pricing"), ExperimentStatus::Running);
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURE-INJECTING STORE
// ═══════════════════════════════════════════════════════════════════════════

/// Delegates to a real engine, failing selected calls to simulate a broken
/// dependency during evaluation or propagation.
struct FailingStore {
    inner: Arc<CalibraStorageEngine>,
    poison_accuracy_tenant: Option<String>,
    poison_append_tenant: Option<String>,
}

fn injected() -> StorageError {
    StorageError::SqliteError { message: "injected failure".to_string() }
}

impl IAccuracyStore for FailingStore {
    fn record_accuracy(&self, row: &AccuracyRow) -> Result<(), StorageError> {
        self.inner.record_accuracy(row)
    }
    fn query_accuracy_since(
        &self,
        tenant_ids: &[String],
        since: i64,
    ) -> Result<Vec<AccuracyRow>, StorageError> {
        if let Some(poison) = &self.poison_accuracy_tenant {
            if tenant_ids.contains(poison) {
                return Err(injected());
            }
        }
        self.inner.query_accuracy_since(tenant_ids, since)
    }
    fn prune_accuracy_before(&self, cutoff: i64) -> Result<usize, StorageError> {
        self.inner.prune_accuracy_before(cutoff)
    }
}

impl IReliabilitySource for FailingStore {
    fn latest_reliability(
        &self,
        tenant_ids: &[String],
    ) -> Result<Vec<ReliabilityRow>, StorageError> {
        self.inner.latest_reliability(tenant_ids)
    }
}

impl IWeightLedger for FailingStore {
    fn append_weight_vector(&self, row: &WeightVectorRow) -> Result<(), StorageError> {
        if self.poison_append_tenant.as_deref() == Some(row.tenant_id.as_str()) {
            return Err(injected());
        }
        self.inner.append_weight_vector(row)
    }
    fn latest_weight_vector_among(
        &self,
        tenant_ids: &[String],
    ) -> Result<Option<WeightVectorRow>, StorageError> {
        self.inner.latest_weight_vector_among(tenant_ids)
    }
    fn query_weight_history(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<WeightVectorRow>, StorageError> {
        self.inner.query_weight_history(tenant_id, limit)
    }
}

impl IExperimentStore for FailingStore {
    fn create_experiment(&self, row: &ExperimentRow) -> Result<(), StorageError> {
        self.inner.create_experiment(row)
    }
    fn query_running_experiments(
        &self,
        family: &str,
    ) -> Result<Vec<ExperimentRow>, StorageError> {
        self.inner.query_running_experiments(family)
    }
    fn query_experiment(&self, id: &str) -> Result<Option<ExperimentRow>, StorageError> {
        self.inner.query_experiment(id)
    }
    fn assign_tenants(
        &self,
        experiment_id: &str,
        tenant_ids: &[String],
    ) -> Result<(), StorageError> {
        self.inner.assign_tenants(experiment_id, tenant_ids)
    }
    fn query_assignments(&self, experiment_id: &str) -> Result<Vec<String>, StorageError> {
        self.inner.query_assignments(experiment_id)
    }
    fn complete_experiment(
        &self,
        id: &str,
        status: ExperimentStatus,
        finished_at: i64,
        notes: &str,
    ) -> Result<bool, StorageError> {
        self.inner.complete_experiment(id, status, finished_at, notes)
    }
}

impl ITenantSettings for FailingStore {
    fn query_tenant_settings(&self) -> Result<Vec<TenantSettingRow>, StorageError> {
        self.inner.query_tenant_settings()
    }
    fn upsert_tenant_setting(
        &self,
        tenant_id: &str,
        self_tuning_enabled: bool,
    ) -> Result<(), StorageError> {
        self.inner.upsert_tenant_setting(tenant_id, self_tuning_enabled)
    }
}
