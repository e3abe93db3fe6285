//! `IAccuracyStore` trait — forecast accuracy records.
//!
//! Maps to `calibra-storage/src/queries/accuracy.rs`.

use crate::errors::StorageError;
use std::sync::Arc;

/// One forecast accuracy measurement for one tenant on one evaluation date.
/// Immutable once written; consumed only in aggregate.
#[derive(Debug, Clone)]
pub struct AccuracyRow {
    pub tenant_id: String,
    pub evaluation_date: i64,
    pub predicted_success_rate: f64,
    pub actual_success_rate: f64,
}

/// Accuracy record storage operations.
pub trait IAccuracyStore: Send + Sync {
    /// Persist one accuracy record. A record already present for the same
    /// tenant and evaluation date is left untouched.
    fn record_accuracy(&self, row: &AccuracyRow) -> Result<(), StorageError>;

    /// Accuracy records for a tenant set with `evaluation_date >= since`.
    /// An empty tenant set yields an empty result.
    fn query_accuracy_since(
        &self,
        tenant_ids: &[String],
        since: i64,
    ) -> Result<Vec<AccuracyRow>, StorageError>;

    /// Delete records older than `cutoff`. Returns the number deleted.
    fn prune_accuracy_before(&self, cutoff: i64) -> Result<usize, StorageError>;
}

impl<T: IAccuracyStore + ?Sized> IAccuracyStore for Arc<T> {
    fn record_accuracy(&self, row: &AccuracyRow) -> Result<(), StorageError> {
        (**self).record_accuracy(row)
    }
    fn query_accuracy_since(
        &self,
        tenant_ids: &[String],
        since: i64,
    ) -> Result<Vec<AccuracyRow>, StorageError> {
        (**self).query_accuracy_since(tenant_ids, since)
    }
    fn prune_accuracy_before(&self, cutoff: i64) -> Result<usize, StorageError> {
        (**self).prune_accuracy_before(cutoff)
    }
}
