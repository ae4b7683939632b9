//! Error types for the execution ledger.

use thiserror::Error;

/// Execution ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open or create the ledger database (L001).
    #[error("[L001] Ledger connection failed: {0}")]
    ConnectionError(String),

    /// Schema migration failed (L002).
    #[error("[L002] Ledger migration failed: {0}")]
    MigrationError(String),

    /// SQL execution error inside the ledger (L003).
    #[error("[L003] Ledger query failed: {0}")]
    QueryError(String),

    /// Transaction management error (L004).
    #[error("[L004] Ledger transaction failed: {0}")]
    TransactionError(String),

    /// Run id not present (L005).
    #[error("[L005] Run {run_id} not found in ledger")]
    RunNotFound { run_id: i64 },

    /// Unit not present in a run (L006).
    #[error("[L006] Unit '{unit}' not found in run {run_id}")]
    UnitNotFound { run_id: i64, unit: String },

    /// A stored status or stage label could not be read back (L007).
    #[error("[L007] Unrecognised ledger value '{value}' in column {column}")]
    InvalidValue { column: String, value: String },

    /// Connection mutex poisoned (L008).
    #[error("[L008] Ledger mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Writing the fallback log failed (L009).
    #[error("[L009] Failed to write fallback log '{path}': {source}")]
    FallbackWrite {
        path: String,
        source: std::io::Error,
    },

    /// Operation needs a run in a different status (L010).
    #[error("[L010] Run {run_id} is {status}, expected {expected}")]
    UnexpectedRunStatus {
        run_id: i64,
        status: String,
        expected: String,
    },
}

/// Result type alias for [`LedgerError`].
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Attach a description of the failed operation to driver errors.
pub(crate) trait LedgerResultExt<T> {
    fn ledger_context(self, what: &str) -> LedgerResult<T>;
}

impl<T> LedgerResultExt<T> for Result<T, duckdb::Error> {
    fn ledger_context(self, what: &str) -> LedgerResult<T> {
        self.map_err(|e| LedgerError::QueryError(format!("{what}: {e}")))
    }
}
