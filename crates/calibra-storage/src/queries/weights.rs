//! weight_ledger table queries.
//!
//! The ledger is append-only; "current" weights for a tenant are the
//! latest row by `adjusted_at`.

use calibra_core::errors::StorageError;
use calibra_core::traits::storage::{ReliabilityRow, WeightVectorRow};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use crate::connection::sqe;

use super::placeholders;

/// Append one ledger row.
pub fn append_weight_vector(
    conn: &Connection,
    row: &WeightVectorRow,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO weight_ledger
             (tenant_id, weight_arima, weight_gradient, weight_bayes,
              reliability, mae, adjusted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(sqe)?;

    stmt.execute(params![
        row.tenant_id,
        row.weight_arima,
        row.weight_gradient,
        row.weight_bayes,
        row.reliability,
        row.mae,
        row.adjusted_at,
    ])
    .map_err(sqe)?;
    Ok(())
}

/// The single most recent row among a tenant set, by `adjusted_at`
/// descending. Never an average and never a row from outside the set.
pub fn latest_weight_vector_among(
    conn: &Connection,
    tenant_ids: &[String],
) -> Result<Option<WeightVectorRow>, StorageError> {
    if tenant_ids.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "SELECT tenant_id, weight_arima, weight_gradient, weight_bayes,
                reliability, mae, adjusted_at
         FROM weight_ledger
         WHERE tenant_id IN ({})
         ORDER BY adjusted_at DESC, id DESC
         LIMIT 1",
        placeholders(tenant_ids.len()),
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;

    let params: Vec<&dyn ToSql> = tenant_ids.iter().map(|t| t as &dyn ToSql).collect();
    stmt.query_row(&params[..], map_weight_row)
        .optional()
        .map_err(sqe)
}

/// Newest-first ledger history for one tenant.
pub fn query_weight_history(
    conn: &Connection,
    tenant_id: &str,
    limit: usize,
) -> Result<Vec<WeightVectorRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT tenant_id, weight_arima, weight_gradient, weight_bayes,
                    reliability, mae, adjusted_at
             FROM weight_ledger
             WHERE tenant_id = ?1
             ORDER BY adjusted_at DESC, id DESC
             LIMIT ?2",
        )
        .map_err(sqe)?;

    let rows = stmt
        .query_map(params![tenant_id, limit as i64], map_weight_row)
        .map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Latest reliability per tenant, derived from each tenant's newest ledger
/// row. Tenants with no rows are absent from the result.
pub fn latest_reliability(
    conn: &Connection,
    tenant_ids: &[String],
) -> Result<Vec<ReliabilityRow>, StorageError> {
    if tenant_ids.is_empty() {
        return Ok(Vec::new());
    }

    // Bare-column semantics: with MAX(adjusted_at) in the select list,
    // SQLite resolves `reliability` from the row holding the maximum.
    let sql = format!(
        "SELECT tenant_id, reliability, MAX(adjusted_at)
         FROM weight_ledger
         WHERE tenant_id IN ({})
         GROUP BY tenant_id
         ORDER BY tenant_id",
        placeholders(tenant_ids.len()),
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;

    let params: Vec<&dyn ToSql> = tenant_ids.iter().map(|t| t as &dyn ToSql).collect();
    let rows = stmt
        .query_map(&params[..], |row| {
            Ok(ReliabilityRow {
                tenant_id: row.get(0)?,
                reliability: row.get(1)?,
            })
        })
        .map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Shared row mapper for weight ledger queries.
fn map_weight_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeightVectorRow> {
    Ok(WeightVectorRow {
        tenant_id: row.get(0)?,
        weight_arima: row.get(1)?,
        weight_gradient: row.get(2)?,
        weight_bayes: row.get(3)?,
        reliability: row.get(4)?,
        mae: row.get(5)?,
        adjusted_at: row.get(6)?,
    })
}
