//! dw-db - Database abstraction layer for dwflow
//!
//! This crate provides the `Database` trait with its DuckDB implementation,
//! and the `TableSource` capability behind which every extraction source
//! kind (CSV, Parquet, DuckDB file) is read.

pub mod duckdb;
pub mod error;
pub(crate) mod row_helpers;
pub mod source;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use source::{source_for, DuckDbSource, FileSource, SourceColumn, TableSource};
pub use traits::{Database, Row};
