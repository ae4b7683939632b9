//! Configuration types and parsing for dwflow.yml

use crate::error::{CoreError, CoreResult};
use crate::names::{is_identifier, TableName};
use crate::schema::TableKind;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Main project configuration from dwflow.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Warehouse database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named target configurations (e.g., dev, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,

    /// Output directory for the ledger and fallback log
    #[serde(default = "default_target_path")]
    pub target_path: String,

    /// Schema (layer) names inside the warehouse database
    #[serde(default)]
    pub layers: Layers,

    /// Default source-system identifier written into audit columns
    #[serde(default = "default_source_system")]
    pub source_system: String,

    /// Extraction sources
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// SQL transforms materialised into the transform layer
    #[serde(default)]
    pub transforms: Vec<SqlStep>,

    /// SQL summaries materialised into the summary layer
    #[serde(default)]
    pub summaries: Vec<SqlStep>,

    /// Directories containing schema description files
    #[serde(default = "default_schema_paths")]
    pub schema_paths: Vec<String>,

    /// Variables available to SQL templates through `var()`
    #[serde(default)]
    pub vars: HashMap<String, serde_yaml::Value>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Source-system override
    #[serde(default)]
    pub source_system: Option<String>,

    /// Variable overrides (merged with base vars)
    #[serde(default)]
    pub vars: HashMap<String, serde_yaml::Value>,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or :memory:); layers are schemas inside it
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Schema names of the warehouse layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Layers {
    pub extract: String,
    pub transform: String,
    pub warehouse: String,
    pub summary: String,
    /// Scratch space for fact datasets during key resolution
    pub staging: String,
    /// Intermediate storage for key maps
    pub keymap: String,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            extract: "ext".to_string(),
            transform: "trn".to_string(),
            warehouse: "dwh".to_string(),
            summary: "sum".to_string(),
            staging: "stg".to_string(),
            keymap: "keymap".to_string(),
        }
    }
}

impl Layers {
    /// Schema a table of the given kind lives in.
    pub fn for_kind(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Summary => &self.summary,
            TableKind::Dimension | TableKind::Fact | TableKind::Other => &self.warehouse,
        }
    }

    /// Every layer schema, in creation order.
    pub fn all(&self) -> [&str; 6] {
        [
            &self.extract,
            &self.transform,
            &self.warehouse,
            &self.summary,
            &self.staging,
            &self.keymap,
        ]
    }

    fn validate(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        for layer in self.all() {
            if !is_identifier(layer) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("layer name '{layer}' is not a valid schema identifier"),
                });
            }
            if !seen.insert(layer) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("layer name '{layer}' is used for more than one layer"),
                });
            }
        }
        Ok(())
    }
}

/// Closed set of extraction source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Directory of `<table>.csv` files
    Csv,
    /// Directory of `<table>.parquet` files
    Parquet,
    /// Another DuckDB database file
    DuckDb,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Csv => write!(f, "csv"),
            SourceKind::Parquet => write!(f, "parquet"),
            SourceKind::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// An extraction source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Source name, used in unit names and as the default source system
    pub name: TableName,

    pub kind: SourceKind,

    /// Directory (csv, parquet) or database file (duckdb), relative to the project
    pub path: String,

    /// Tables to extract; empty means every table the source lists
    #[serde(default)]
    pub tables: Vec<TableName>,

    /// Schema inside a duckdb source (default: main)
    #[serde(default)]
    pub schema: Option<String>,
}

/// A named SQL step (transform or summary).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlStep {
    /// Output table name
    pub name: TableName,

    /// Path to the SELECT statement, relative to the project root
    pub sql: String,

    /// Other steps of the same kind that must run first
    #[serde(default)]
    pub depends_on: Vec<TableName>,
}

fn default_target_path() -> String {
    "target".to_string()
}

fn default_source_system() -> String {
    "dwflow".to_string()
}

fn default_schema_paths() -> Vec<String> {
    vec!["schema".to_string()]
}

fn default_db_path() -> String {
    "warehouse.duckdb".to_string()
}

/// Config file names searched in a project directory, in priority order.
const CONFIG_FILE_NAMES: [&str; 2] = ["dwflow.yml", "dwflow.yaml"];

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        self.layers.validate()?;

        check_unique("source", self.sources.iter().map(|s| s.name.as_str()))?;
        check_unique("transform", self.transforms.iter().map(|t| t.name.as_str()))?;
        check_unique("summary", self.summaries.iter().map(|t| t.name.as_str()))?;

        let transform_names: HashSet<&str> =
            self.transforms.iter().map(|t| t.name.as_str()).collect();
        for step in &self.transforms {
            for dep in &step.depends_on {
                if !transform_names.contains(dep.as_str()) {
                    return Err(CoreError::ConfigInvalid {
                        message: format!(
                            "transform '{}' depends on unknown transform '{}'",
                            step.name, dep
                        ),
                    });
                }
            }
        }

        let summary_names: HashSet<&str> =
            self.summaries.iter().map(|t| t.name.as_str()).collect();
        for step in &self.summaries {
            for dep in &step.depends_on {
                if !summary_names.contains(dep.as_str()) {
                    return Err(CoreError::ConfigInvalid {
                        message: format!(
                            "summary '{}' depends on unknown summary '{}'",
                            step.name, dep
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Get database configuration, optionally applying target overrides
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => {
                let target_config =
                    self.targets
                        .get(name)
                        .ok_or_else(|| CoreError::ConfigInvalid {
                            message: format!(
                                "Target '{}' not found. Available targets: {}",
                                name,
                                self.available_targets().join(", ")
                            ),
                        })?;

                Ok(target_config
                    .database
                    .clone()
                    .unwrap_or_else(|| self.database.clone()))
            }
            None => Ok(self.database.clone()),
        }
    }

    /// Get source system, optionally applying target overrides
    pub fn get_source_system(&self, target: Option<&str>) -> &str {
        target
            .and_then(|name| self.targets.get(name))
            .and_then(|tc| tc.source_system.as_deref())
            .unwrap_or(&self.source_system)
    }

    /// Get merged variables, with target overrides taking precedence.
    pub fn get_merged_vars(
        &self,
        target: Option<&str>,
    ) -> Cow<'_, HashMap<String, serde_yaml::Value>> {
        let target_config = target.and_then(|name| self.targets.get(name));
        match target_config.filter(|tc| !tc.vars.is_empty()) {
            Some(tc) => {
                let mut vars = self.vars.clone();
                for (key, value) in &tc.vars {
                    vars.insert(key.clone(), value.clone());
                }
                Cow::Owned(vars)
            }
            None => Cow::Borrowed(&self.vars),
        }
    }

    /// Sorted list of target names
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Resolve target from CLI flag or DW_TARGET environment variable
    ///
    /// Priority: CLI flag > DW_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var("DW_TARGET").ok())
    }

    /// Get absolute schema paths relative to a project root
    pub fn schema_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.schema_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get absolute target path relative to a project root
    pub fn target_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.target_path)
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CoreError::Duplicate {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
