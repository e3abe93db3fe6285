//! `IExperimentStore` trait — canary experiments and their tenant groups.
//!
//! Maps to `calibra-storage/src/queries/experiments.rs`.

use crate::errors::StorageError;
use crate::types::experiment::ExperimentStatus;
use std::sync::Arc;

/// One canary experiment.
#[derive(Debug, Clone)]
pub struct ExperimentRow {
    pub id: String,
    pub family: String,
    pub status: ExperimentStatus,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub notes: Option<String>,
}

/// Experiment registry operations.
pub trait IExperimentStore: Send + Sync {
    /// Register a new experiment. Used by the admin/automation creation
    /// flow; experiments are always created in status `running`.
    fn create_experiment(&self, row: &ExperimentRow) -> Result<(), StorageError>;

    /// All `running` experiments in the given family, oldest first.
    fn query_running_experiments(
        &self,
        family: &str,
    ) -> Result<Vec<ExperimentRow>, StorageError>;

    /// Fetch one experiment by id.
    fn query_experiment(&self, id: &str) -> Result<Option<ExperimentRow>, StorageError>;

    /// Attach tenants to an experiment's canary group. Assignments are
    /// immutable once the experiment starts; duplicates are ignored.
    fn assign_tenants(
        &self,
        experiment_id: &str,
        tenant_ids: &[String],
    ) -> Result<(), StorageError>;

    /// The canary group of one experiment.
    fn query_assignments(&self, experiment_id: &str) -> Result<Vec<String>, StorageError>;

    /// Move an experiment from `running` to a terminal status, stamping
    /// `finished_at` and `notes`. Returns `false` (and writes nothing)
    /// when the experiment is not currently `running` — the benign
    /// double-evaluation race resolves to a no-op here.
    fn complete_experiment(
        &self,
        id: &str,
        status: ExperimentStatus,
        finished_at: i64,
        notes: &str,
    ) -> Result<bool, StorageError>;
}

impl<T: IExperimentStore + ?Sized> IExperimentStore for Arc<T> {
    fn create_experiment(&self, row: &ExperimentRow) -> Result<(), StorageError> {
        (**self).create_experiment(row)
    }
    fn query_running_experiments(
        &self,
        family: &str,
    ) -> Result<Vec<ExperimentRow>, StorageError> {
        (**self).query_running_experiments(family)
    }
    fn query_experiment(&self, id: &str) -> Result<Option<ExperimentRow>, StorageError> {
        (**self).query_experiment(id)
    }
    fn assign_tenants(
        &self,
        experiment_id: &str,
        tenant_ids: &[String],
    ) -> Result<(), StorageError> {
        (**self).assign_tenants(experiment_id, tenant_ids)
    }
    fn query_assignments(&self, experiment_id: &str) -> Result<Vec<String>, StorageError> {
        (**self).query_assignments(experiment_id)
    }
    fn complete_experiment(
        &self,
        id: &str,
        status: ExperimentStatus,
        finished_at: i64,
        notes: &str,
    ) -> Result<bool, StorageError> {
        (**self).complete_experiment(id, status, finished_at, notes)
    }
}
