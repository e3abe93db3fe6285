//! `ITenantSettings` trait — per-tenant self-tuning opt-in.

use crate::errors::StorageError;
use std::sync::Arc;

/// Per-tenant opt-in flag for self-tuning weight propagation.
#[derive(Debug, Clone)]
pub struct TenantSettingRow {
    pub tenant_id: String,
    pub self_tuning_enabled: bool,
}

/// Tenant settings operations. The controller only reads; the upsert
/// exists for the admin flow and tests.
pub trait ITenantSettings: Send + Sync {
    /// All tenants that have a settings row, with their opt-in flag.
    fn query_tenant_settings(&self) -> Result<Vec<TenantSettingRow>, StorageError>;

    fn upsert_tenant_setting(
        &self,
        tenant_id: &str,
        self_tuning_enabled: bool,
    ) -> Result<(), StorageError>;
}

impl<T: ITenantSettings + ?Sized> ITenantSettings for Arc<T> {
    fn query_tenant_settings(&self) -> Result<Vec<TenantSettingRow>, StorageError> {
        (**self).query_tenant_settings()
    }
    fn upsert_tenant_setting(
        &self,
        tenant_id: &str,
        self_tuning_enabled: bool,
    ) -> Result<(), StorageError> {
        (**self).upsert_tenant_setting(tenant_id, self_tuning_enabled)
    }
}
