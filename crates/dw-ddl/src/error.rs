//! Error types for dw-ddl

use dw_core::CoreError;
use dw_db::DbError;
use thiserror::Error;

/// Physical model errors
#[derive(Error, Debug)]
pub enum DdlError {
    /// Table missing from the schema model (P001)
    #[error("[P001] Table '{0}' is not declared in the schema model")]
    TableNotFound(String),

    /// Table cannot be laid out physically (P002)
    #[error("[P002] Cannot build DDL for '{table}': {message}")]
    Invalid { table: String, message: String },

    /// A statement failed while applying a plan (P003)
    #[error("[P003] DDL statement {index} ({kind} on {table}) failed: {source}")]
    ApplyFailed {
        index: usize,
        kind: String,
        table: String,
        #[source]
        source: DbError,
    },

    /// Core error (P004)
    #[error("[P004] {0}")]
    Core(#[from] CoreError),
}

/// Result type alias for DdlError
pub type DdlResult<T> = Result<T, DdlError>;
