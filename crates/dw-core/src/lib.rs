//! dw-core - Core library for dwflow
//!
//! This crate provides the shared types used across all dwflow components:
//! project configuration, the schema model with its dimensional roles,
//! pipeline stages and the dependency ordering of SQL steps.

pub mod config;
pub mod dag;
pub mod error;
pub mod names;
pub mod project;
pub mod schema;
pub mod sql_utils;
pub mod stage;

pub use config::{Config, DatabaseConfig, Layers, SourceConfig, SourceKind, SqlStep};
pub use dag::StepDag;
pub use error::{CoreError, CoreResult};
pub use names::{ColumnName, TableName, UnitName};
pub use project::{LoadedStep, Project};
pub use schema::{
    ColumnRole, ColumnSchema, DefaultRow, SchemaModel, TableKind, TableSchema, AUDIT_DIMENSION,
    AUDIT_KEY_COLUMN, SENTINEL_KEY,
};
pub use stage::{LoadPhase, RunMode, Stage, StageSet};
