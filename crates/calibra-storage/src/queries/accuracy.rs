//! accuracy_records table queries.

use calibra_core::errors::StorageError;
use calibra_core::traits::storage::AccuracyRow;
use rusqlite::{params, Connection, ToSql};

use crate::connection::sqe;

use super::placeholders;

/// Insert one accuracy record. A record already present for the same
/// tenant and evaluation date is left untouched.
pub fn record_accuracy(conn: &Connection, row: &AccuracyRow) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO accuracy_records
             (tenant_id, evaluation_date, predicted_success_rate, actual_success_rate)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(sqe)?;

    stmt.execute(params![
        row.tenant_id,
        row.evaluation_date,
        row.predicted_success_rate,
        row.actual_success_rate,
    ])
    .map_err(sqe)?;
    Ok(())
}

/// Accuracy records for a tenant set with `evaluation_date >= since`.
pub fn query_accuracy_since(
    conn: &Connection,
    tenant_ids: &[String],
    since: i64,
) -> Result<Vec<AccuracyRow>, StorageError> {
    if tenant_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT tenant_id, evaluation_date, predicted_success_rate, actual_success_rate
         FROM accuracy_records
         WHERE tenant_id IN ({}) AND evaluation_date >= ?{}
         ORDER BY tenant_id, evaluation_date",
        placeholders(tenant_ids.len()),
        tenant_ids.len() + 1,
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;

    let mut params: Vec<&dyn ToSql> = tenant_ids.iter().map(|t| t as &dyn ToSql).collect();
    params.push(&since);

    let rows = stmt
        .query_map(&params[..], |row| {
            Ok(AccuracyRow {
                tenant_id: row.get(0)?,
                evaluation_date: row.get(1)?,
                predicted_success_rate: row.get(2)?,
                actual_success_rate: row.get(3)?,
            })
        })
        .map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Delete records with `evaluation_date < cutoff`. Returns the count.
pub fn prune_accuracy_before(conn: &Connection, cutoff: i64) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM accuracy_records WHERE evaluation_date < ?1",
        params![cutoff],
    )
    .map_err(sqe)
}
