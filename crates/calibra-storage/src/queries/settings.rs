//! tenant_settings table queries.

use calibra_core::errors::StorageError;
use calibra_core::traits::storage::TenantSettingRow;
use rusqlite::{params, Connection};

use crate::connection::sqe;

/// All tenants that have a settings row.
pub fn query_tenant_settings(
    conn: &Connection,
) -> Result<Vec<TenantSettingRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT tenant_id, self_tuning_enabled
             FROM tenant_settings ORDER BY tenant_id",
        )
        .map_err(sqe)?;

    let rows = stmt
        .query_map([], |row| {
            Ok(TenantSettingRow {
                tenant_id: row.get(0)?,
                self_tuning_enabled: row.get::<_, i64>(1)? != 0,
            })
        })
        .map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Create or overwrite a tenant's settings row.
pub fn upsert_tenant_setting(
    conn: &Connection,
    tenant_id: &str,
    self_tuning_enabled: bool,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR REPLACE INTO tenant_settings (tenant_id, self_tuning_enabled)
             VALUES (?1, ?2)",
        )
        .map_err(sqe)?;

    stmt.execute(params![tenant_id, self_tuning_enabled as i64])
        .map_err(sqe)?;
    Ok(())
}
