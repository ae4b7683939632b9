//! Versioned ledger schema.
//!
//! Every migration is applied in its own transaction together with its row in
//! `dw_ledger.schema_version`, so a ledger is always at exactly one version.
//! A ledger written by a newer `dw` (a version this build does not know) is
//! refused rather than written to.

use crate::ddl::{Migration, MIGRATIONS};
use crate::error::{LedgerError, LedgerResult};
use duckdb::Connection;

const VERSION_TABLE_DDL: &str = "CREATE SCHEMA IF NOT EXISTS dw_ledger;
     CREATE TABLE IF NOT EXISTS dw_ledger.schema_version (
         version    INTEGER NOT NULL,
         applied_at TIMESTAMP NOT NULL DEFAULT now()
     );";

fn migration_error(what: impl std::fmt::Display) -> LedgerError {
    LedgerError::MigrationError(what.to_string())
}

/// Highest recorded schema version, 0 for a fresh ledger.
pub fn current_version(conn: &Connection) -> LedgerResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM dw_ledger.schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| migration_error(format!("failed to read schema version: {e}")))
}

/// Bring the ledger schema up to date. Returns how many migrations ran.
pub fn run_migrations(conn: &Connection) -> LedgerResult<usize> {
    apply_migrations(conn, MIGRATIONS)
}

pub(crate) fn apply_migrations(conn: &Connection, migrations: &[Migration]) -> LedgerResult<usize> {
    conn.execute_batch(VERSION_TABLE_DDL)
        .map_err(|e| migration_error(format!("failed to create schema_version: {e}")))?;

    let current = current_version(conn)?;
    let known = migrations.last().map_or(0, |m| m.version);
    if current > known {
        return Err(migration_error(format!(
            "ledger schema is v{current:03} but this build only knows up to v{known:03}"
        )));
    }

    let pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > current).collect();
    for migration in &pending {
        apply_one(conn, migration)?;
    }
    Ok(pending.len())
}

fn apply_one(conn: &Connection, migration: &Migration) -> LedgerResult<()> {
    let version = migration.version;
    log::debug!("Applying ledger migration v{version:03}");

    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| migration_error(format!("v{version:03}: BEGIN failed: {e}")))?;
    let applied = conn.execute_batch(migration.sql).and_then(|()| {
        conn.execute(
            "INSERT INTO dw_ledger.schema_version (version) VALUES (?)",
            duckdb::params![version],
        )
    });
    match applied {
        Ok(_) => conn
            .execute_batch("COMMIT")
            .map_err(|e| migration_error(format!("v{version:03}: COMMIT failed: {e}"))),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(migration_error(format!("migration v{version:03} failed: {e}")))
        }
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
