//! dw-sql - SQL step handling for dwflow
//!
//! Transform and summary bodies are minijinja templates. This crate renders
//! them against the project context, checks that the result is a single
//! query and fingerprints the SQL that actually runs.

pub mod checksum;
pub mod error;
pub mod template;
pub mod validate;

pub use checksum::compute_checksum;
pub use error::{SqlError, SqlResult};
pub use template::{PreparedSql, SqlRenderer, TemplateContext};
pub use validate::validate_query;
