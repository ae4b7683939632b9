//! Error types for dw-sql

use thiserror::Error;

/// Templating and SQL validation errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// Template render error (S001)
    #[error("[S001] Template render error: {0}")]
    RenderError(String),

    /// Undefined template variable (S002)
    #[error("[S002] {0}. Define it in the vars: section of dwflow.yml")]
    UndefinedVariable(String),

    /// SQL parse error (S003)
    #[error("[S003] SQL parse error in '{step}' at line {line}, column {column}: {message}")]
    ParseError {
        step: String,
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S004)
    #[error("[S004] SQL of '{0}' is empty after rendering")]
    EmptySql(String),

    /// More than one statement (S005)
    #[error("[S005] '{step}' must contain exactly one query, found {count} statements")]
    MultipleStatements { step: String, count: usize },

    /// Statement is not a query (S006)
    #[error("[S006] '{step}' must be a SELECT query, found {kind}")]
    NotAQuery { step: String, kind: String },
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;

impl From<minijinja::Error> for SqlError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::UndefinedError => SqlError::UndefinedVariable(err.to_string()),
            _ => SqlError::RenderError(err.to_string()),
        }
    }
}
