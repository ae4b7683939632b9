//! Error types for dw-core

use thiserror::Error;

/// Core error type for dwflow
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Project directory not found
    #[error("[E004] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// E005: Malformed schema description
    #[error("[E005] Invalid schema for table '{table}': {message}")]
    SchemaInvalid { table: String, message: String },

    /// E006: Table referenced but not declared in any schema file
    #[error("[E006] Table not found in schema model: {name}")]
    TableNotFound { name: String },

    /// E007: Circular dependency detected
    #[error("[E007] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E008: Duplicate name (table, transform, unit)
    #[error("[E008] Duplicate {kind} name: {name}")]
    Duplicate { kind: String, name: String },

    /// E009: Empty name where a non-empty identifier is required
    #[error("[E009] Empty name: {context}")]
    EmptyName { context: String },

    /// E010: Unknown stage label
    #[error("[E010] Unknown stage '{label}'. Valid stages: extract, transform, load, summarise")]
    UnknownStage { label: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: Schema/YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
