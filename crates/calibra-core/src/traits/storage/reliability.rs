//! `IReliabilitySource` trait — latest-known forecast reliability.

use crate::errors::StorageError;
use std::sync::Arc;

/// Latest reliability figure for one tenant: the fraction of forecasts
/// whose confidence interval contained the actual outcome.
#[derive(Debug, Clone)]
pub struct ReliabilityRow {
    pub tenant_id: String,
    pub reliability: f64,
}

/// Read-only aggregated reliability view.
///
/// Returns at most one row per tenant (the most recent figure). Tenants
/// with no data are absent from the result — absence is not an error.
pub trait IReliabilitySource: Send + Sync {
    fn latest_reliability(
        &self,
        tenant_ids: &[String],
    ) -> Result<Vec<ReliabilityRow>, StorageError>;
}

impl<T: IReliabilitySource + ?Sized> IReliabilitySource for Arc<T> {
    fn latest_reliability(
        &self,
        tenant_ids: &[String],
    ) -> Result<Vec<ReliabilityRow>, StorageError> {
        (**self).latest_reliability(tenant_ids)
    }
}
