//! Error types for dw-keys

use dw_db::DbError;
use thiserror::Error;

/// Key resolution errors
#[derive(Error, Debug)]
pub enum KeyError {
    /// No key map has been built for the dimension (K001)
    #[error("[K001] No key map for dimension '{dimension}'; load the dimension first")]
    MissingKeyMap { dimension: String },

    /// Two dimension rows share a natural key (K002)
    #[error("[K002] Dimension '{dimension}' has duplicate natural key '{natural_key}'")]
    DuplicateNaturalKey {
        dimension: String,
        natural_key: String,
    },

    /// Fact dataset lacks a natural-key column of the dimension (K003)
    #[error("[K003] Dataset '{dataset}' has no column '{column}' needed to resolve '{dimension}'")]
    MissingNaturalKeyColumn {
        dataset: String,
        column: String,
        dimension: String,
    },

    /// The table cannot carry a key map (K004)
    #[error("[K004] Table '{table}' cannot be used for key resolution: {message}")]
    InvalidDimension { table: String, message: String },

    /// Resolution changed the number of rows (K005)
    #[error("[K005] Resolving '{column}' on '{dataset}' changed row count from {before} to {after}")]
    RowCountChanged {
        dataset: String,
        column: String,
        before: usize,
        after: usize,
    },

    /// Database error (K006)
    #[error("[K006] {0}")]
    Database(#[from] DbError),
}

/// Result type alias for KeyError
pub type KeyResult<T> = Result<T, KeyError>;
