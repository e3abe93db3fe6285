//! `CalibraStorageEngine` — unified storage engine implementing the five
//! core storage traits over one SQLite connection.
//!
//! The controller is a single-flow batch job, so a mutex-serialized
//! connection is the whole concurrency story. All table access goes
//! through `with_conn()`; no code outside this crate touches a raw
//! `&Connection`.

use std::path::Path;
use std::sync::Mutex;

use calibra_core::errors::StorageError;
use calibra_core::traits::storage::{
    AccuracyRow, ExperimentRow, IAccuracyStore, IExperimentStore, IReliabilitySource,
    ITenantSettings, IWeightLedger, ReliabilityRow, TenantSettingRow, WeightVectorRow,
};
use calibra_core::types::experiment::ExperimentStatus;
use rusqlite::Connection;

use crate::connection;
use crate::queries;

/// The unified Calibra storage engine.
pub struct CalibraStorageEngine {
    conn: Mutex<Connection>,
}

impl CalibraStorageEngine {
    /// Open a file-backed engine at the given path.
    /// Applies pragmas and runs migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = connection::open(path)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory engine (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.conn.lock().map_err(|_| StorageError::SqliteError {
            message: "connection mutex poisoned".to_string(),
        })?;
        f(&conn)
    }
}

impl IAccuracyStore for CalibraStorageEngine {
    fn record_accuracy(&self, row: &AccuracyRow) -> Result<(), StorageError> {
        self.with_conn(|conn| queries::accuracy::record_accuracy(conn, row))
    }

    fn query_accuracy_since(
        &self,
        tenant_ids: &[String],
        since: i64,
    ) -> Result<Vec<AccuracyRow>, StorageError> {
        self.with_conn(|conn| queries::accuracy::query_accuracy_since(conn, tenant_ids, since))
    }

    fn prune_accuracy_before(&self, cutoff: i64) -> Result<usize, StorageError> {
        self.with_conn(|conn| queries::accuracy::prune_accuracy_before(conn, cutoff))
    }
}

impl IReliabilitySource for CalibraStorageEngine {
    fn latest_reliability(
        &self,
        tenant_ids: &[String],
    ) -> Result<Vec<ReliabilityRow>, StorageError> {
        self.with_conn(|conn| queries::weights::latest_reliability(conn, tenant_ids))
    }
}

impl IWeightLedger for CalibraStorageEngine {
    fn append_weight_vector(&self, row: &WeightVectorRow) -> Result<(), StorageError> {
        self.with_conn(|conn| queries::weights::append_weight_vector(conn, row))
    }

    fn latest_weight_vector_among(
        &self,
        tenant_ids: &[String],
    ) -> Result<Option<WeightVectorRow>, StorageError> {
        self.with_conn(|conn| queries::weights::latest_weight_vector_among(conn, tenant_ids))
    }

    fn query_weight_history(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<WeightVectorRow>, StorageError> {
        self.with_conn(|conn| queries::weights::query_weight_history(conn, tenant_id, limit))
    }
}

impl IExperimentStore for CalibraStorageEngine {
    fn create_experiment(&self, row: &ExperimentRow) -> Result<(), StorageError> {
        self.with_conn(|conn| queries::experiments::create_experiment(conn, row))
    }

    fn query_running_experiments(
        &self,
        family: &str,
    ) -> Result<Vec<ExperimentRow>, StorageError> {
        self.with_conn(|conn| queries::experiments::query_running_experiments(conn, family))
    }

    fn query_experiment(&self, id: &str) -> Result<Option<ExperimentRow>, StorageError> {
        self.with_conn(|conn| queries::experiments::query_experiment(conn, id))
    }

    fn assign_tenants(
        &self,
        experiment_id: &str,
        tenant_ids: &[String],
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| queries::experiments::assign_tenants(conn, experiment_id, tenant_ids))
    }

    fn query_assignments(&self, experiment_id: &str) -> Result<Vec<String>, StorageError> {
        self.with_conn(|conn| queries::experiments::query_assignments(conn, experiment_id))
    }

    fn complete_experiment(
        &self,
        id: &str,
        status: ExperimentStatus,
        finished_at: i64,
        notes: &str,
    ) -> Result<bool, StorageError> {
        self.with_conn(|conn| {
            queries::experiments::complete_experiment(conn, id, status, finished_at, notes)
        })
    }
}

impl ITenantSettings for CalibraStorageEngine {
    fn query_tenant_settings(&self) -> Result<Vec<TenantSettingRow>, StorageError> {
        self.with_conn(queries::settings::query_tenant_settings)
    }

    fn upsert_tenant_setting(
        &self,
        tenant_id: &str,
        self_tuning_enabled: bool,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            queries::settings::upsert_tenant_setting(conn, tenant_id, self_tuning_enabled)
        })
    }
}
