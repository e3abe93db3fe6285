//! `IWeightLedger` trait — the append-only ensemble weight ledger.
//!
//! Maps to `calibra-storage/src/queries/weights.rs`.

use crate::errors::StorageError;
use std::sync::Arc;

/// One row of the per-tenant weight ledger: the blend coefficients across
/// the three base forecasting models, plus the reliability and MAE measured
/// by the tuning pass that produced them.
///
/// Rows are never updated or deleted; the current vector for a tenant is
/// the latest row by `adjusted_at`. Weights are carried verbatim — the
/// forecasting pipeline owns the sums-to-one convention, not this store.
#[derive(Debug, Clone)]
pub struct WeightVectorRow {
    pub tenant_id: String,
    pub weight_arima: f64,
    pub weight_gradient: f64,
    pub weight_bayes: f64,
    pub reliability: f64,
    pub mae: f64,
    pub adjusted_at: i64,
}

/// Weight ledger operations.
pub trait IWeightLedger: Send + Sync {
    /// Append one ledger row.
    fn append_weight_vector(&self, row: &WeightVectorRow) -> Result<(), StorageError>;

    /// The single most recent row among a tenant set, by `adjusted_at`
    /// descending. `None` when no tenant in the set has a row.
    fn latest_weight_vector_among(
        &self,
        tenant_ids: &[String],
    ) -> Result<Option<WeightVectorRow>, StorageError>;

    /// Newest-first ledger history for one tenant.
    fn query_weight_history(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<WeightVectorRow>, StorageError>;
}

impl<T: IWeightLedger + ?Sized> IWeightLedger for Arc<T> {
    fn append_weight_vector(&self, row: &WeightVectorRow) -> Result<(), StorageError> {
        (**self).append_weight_vector(row)
    }
    fn latest_weight_vector_among(
        &self,
        tenant_ids: &[String],
    ) -> Result<Option<WeightVectorRow>, StorageError> {
        (**self).latest_weight_vector_among(tenant_ids)
    }
    fn query_weight_history(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<WeightVectorRow>, StorageError> {
        (**self).query_weight_history(tenant_id, limit)
    }
}
