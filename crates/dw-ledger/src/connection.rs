//! Ledger database connection wrapper.
//!
//! [`Ledger`] owns a DuckDB [`Connection`] and provides helpers for opening,
//! migrating, and transacting against the ledger database. Run, unit and
//! step operations live in [`crate::runs`], [`crate::units`] and
//! [`crate::steps`].

use crate::error::{LedgerError, LedgerResult};
use crate::fallback::FallbackLog;
use crate::migration::run_migrations;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// File name of the ledger inside the project's target directory.
pub const LEDGER_FILE: &str = "ledger.duckdb";

/// Wrapper around a DuckDB connection to `target/ledger.duckdb`.
///
/// The connection sits behind a `Mutex` so a `&Ledger` can be held across
/// awaits by the runner; all access is still strictly sequential.
pub struct Ledger {
    conn: Mutex<Connection>,
    fallback: Option<FallbackLog>,
}

impl Ledger {
    /// Open (or create) the ledger at `path` and run pending migrations.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::ConnectionError(format!("{e}: {}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::ConnectionError(format!("{e}: {}", path.display())))?;
        let applied = run_migrations(&conn)?;
        log::debug!(
            "Opened ledger at {} ({applied} migration(s) applied)",
            path.display()
        );
        Ok(Self {
            conn: Mutex::new(conn),
            fallback: None,
        })
    }

    /// Create an in-memory ledger with all migrations applied.
    ///
    /// Useful for unit tests that don't need persistence.
    pub fn open_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::ConnectionError(e.to_string()))?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            fallback: None,
        })
    }

    /// Open the ledger inside a target directory, with the fallback log beside it.
    pub fn open_in_target(target_dir: &Path) -> LedgerResult<Self> {
        Ok(Self::open(&target_dir.join(LEDGER_FILE))?
            .with_fallback(FallbackLog::in_target(target_dir)))
    }

    /// Attach a fallback log used by [`Ledger::escalate`].
    pub fn with_fallback(mut self, fallback: FallbackLog) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn fallback(&self) -> Option<&FallbackLog> {
        self.fallback.as_ref()
    }

    /// Lock the underlying connection.
    pub(crate) fn conn(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::MutexPoisoned(e.to_string()))
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error.
    pub fn transaction<F, T>(&self, body: F) -> LedgerResult<T>
    where
        F: FnOnce(&Connection) -> LedgerResult<T>,
    {
        let conn = self.conn()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| LedgerError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = conn.execute_batch("COMMIT") {
                    let _ = conn.execute_batch("ROLLBACK");
                    return Err(LedgerError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                let _ = conn.execute_batch("ROLLBACK");
            }
        }
        result
    }

    /// Report a failed ledger write: log it and append it to the fallback log.
    ///
    /// Best-effort; a failure to write the fallback log is itself only logged.
    pub fn escalate(&self, context: &str, err: &LedgerError) {
        log::error!("Ledger write failed ({context}): {err}");
        if let Some(fallback) = &self.fallback {
            if let Err(e) = fallback.append(&format!("{context}: {err}")) {
                log::error!("{e}");
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
