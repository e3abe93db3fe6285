//! Versioned schema migrations, tracked via `PRAGMA user_version`.

use calibra_core::errors::StorageError;
use rusqlite::Connection;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Apply any outstanding migrations. Safe to call on every open.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let mut version = user_version(conn)?;

    if version < 1 {
        migrate_v001(conn)?;
        set_user_version(conn, 1)?;
        version = 1;
        tracing::debug!(version, "applied schema migration");
    }

    Ok(())
}

/// Read the schema version recorded in the database.
pub fn user_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}

fn set_user_version(conn: &Connection, version: u32) -> Result<(), StorageError> {
    conn.pragma_update(None, "user_version", version)
        .map_err(|e| StorageError::MigrationFailed {
            version,
            message: e.to_string(),
        })
}

/// v001 — forecast accuracy, weight ledger, experiments, assignments,
/// tenant settings.
fn migrate_v001(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS accuracy_records (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             tenant_id TEXT NOT NULL,
             evaluation_date INTEGER NOT NULL,
             predicted_success_rate REAL NOT NULL,
             actual_success_rate REAL NOT NULL,
             UNIQUE (tenant_id, evaluation_date)
         );
         CREATE INDEX IF NOT EXISTS idx_accuracy_tenant_date
             ON accuracy_records (tenant_id, evaluation_date);

         CREATE TABLE IF NOT EXISTS weight_ledger (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             tenant_id TEXT NOT NULL,
             weight_arima REAL NOT NULL,
             weight_gradient REAL NOT NULL,
             weight_bayes REAL NOT NULL,
             reliability REAL NOT NULL,
             mae REAL NOT NULL,
             adjusted_at INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_weight_ledger_tenant_adjusted
             ON weight_ledger (tenant_id, adjusted_at DESC);

         CREATE TABLE IF NOT EXISTS experiments (
             id TEXT PRIMARY KEY,
             family TEXT NOT NULL,
             status TEXT NOT NULL DEFAULT 'running',
             started_at INTEGER NOT NULL,
             finished_at INTEGER,
             notes TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_experiments_family_status
             ON experiments (family, status);

         CREATE TABLE IF NOT EXISTS experiment_assignments (
             experiment_id TEXT NOT NULL REFERENCES experiments (id),
             tenant_id TEXT NOT NULL,
             PRIMARY KEY (experiment_id, tenant_id)
         );

         CREATE TABLE IF NOT EXISTS tenant_settings (
             tenant_id TEXT PRIMARY KEY,
             self_tuning_enabled INTEGER NOT NULL DEFAULT 0
         );",
    )
    .map_err(|e| StorageError::MigrationFailed {
        version: 1,
        message: e.to_string(),
    })
}
