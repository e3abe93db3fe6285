//! experiments and experiment_assignments table queries.

use calibra_core::errors::StorageError;
use calibra_core::traits::storage::ExperimentRow;
use calibra_core::types::experiment::ExperimentStatus;
use rusqlite::{params, Connection, OptionalExtension};

use crate::connection::sqe;

/// Register a new experiment.
pub fn create_experiment(conn: &Connection, row: &ExperimentRow) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO experiments (id, family, status, started_at, finished_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(sqe)?;

    stmt.execute(params![
        row.id,
        row.family,
        row.status.as_str(),
        row.started_at,
        row.finished_at,
        row.notes,
    ])
    .map_err(sqe)?;
    Ok(())
}

/// All `running` experiments in one family, oldest first.
pub fn query_running_experiments(
    conn: &Connection,
    family: &str,
) -> Result<Vec<ExperimentRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, family, status, started_at, finished_at, notes
             FROM experiments
             WHERE family = ?1 AND status = 'running'
             ORDER BY started_at",
        )
        .map_err(sqe)?;

    let rows = stmt.query_map(params![family], map_experiment_row).map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Fetch one experiment by id.
pub fn query_experiment(
    conn: &Connection,
    id: &str,
) -> Result<Option<ExperimentRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, family, status, started_at, finished_at, notes
             FROM experiments WHERE id = ?1",
        )
        .map_err(sqe)?;

    stmt.query_row(params![id], map_experiment_row)
        .optional()
        .map_err(sqe)
}

/// Attach tenants to an experiment's canary group. Duplicates are ignored.
pub fn assign_tenants(
    conn: &Connection,
    experiment_id: &str,
    tenant_ids: &[String],
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO experiment_assignments (experiment_id, tenant_id)
             VALUES (?1, ?2)",
        )
        .map_err(sqe)?;

    for tenant_id in tenant_ids {
        stmt.execute(params![experiment_id, tenant_id]).map_err(sqe)?;
    }
    Ok(())
}

/// The canary group of one experiment.
pub fn query_assignments(
    conn: &Connection,
    experiment_id: &str,
) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT tenant_id FROM experiment_assignments
             WHERE experiment_id = ?1 ORDER BY tenant_id",
        )
        .map_err(sqe)?;

    let rows = stmt
        .query_map(params![experiment_id], |row| row.get::<_, String>(0))
        .map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Move an experiment from `running` to a terminal status. Returns `false`
/// when the experiment was not `running` — nothing is written in that case.
pub fn complete_experiment(
    conn: &Connection,
    id: &str,
    status: ExperimentStatus,
    finished_at: i64,
    notes: &str,
) -> Result<bool, StorageError> {
    let updated = conn
        .execute(
            "UPDATE experiments
             SET status = ?1, finished_at = ?2, notes = ?3
             WHERE id = ?4 AND status = 'running'",
            params![status.as_str(), finished_at, notes, id],
        )
        .map_err(sqe)?;
    Ok(updated > 0)
}

/// Shared row mapper for experiment queries.
fn map_experiment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExperimentRow> {
    let status_text: String = row.get(2)?;
    let status = ExperimentStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown experiment status: {status_text}").into(),
        )
    })?;
    Ok(ExperimentRow {
        id: row.get(0)?,
        family: row.get(1)?,
        status,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        notes: row.get(5)?,
    })
}
