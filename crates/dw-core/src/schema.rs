//! Schema model: tables, columns and their dimensional-model roles.
//!
//! The schema description is a set of YAML files, each holding a `tables:`
//! list. Files are read-only input; everything downstream (physical model,
//! key resolution, load units) works from the [`SchemaModel`] built here.

use crate::error::{CoreError, CoreResult};
use crate::names::{ColumnName, TableName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Surrogate key assigned to the "unknown member" row of every dimension.
pub const SENTINEL_KEY: i64 = -1;

/// Name of the built-in audit dimension every fact references.
pub const AUDIT_DIMENSION: &str = "dim_audit";

/// Implicit foreign-key column carried by every fact table.
pub const AUDIT_KEY_COLUMN: &str = "audit_key";

/// Audit columns appended to non-fact, non-audit-dimension tables.
pub const AUDIT_COLUMNS: &[(&str, &str)] = &[
    ("audit_source_system", "VARCHAR"),
    ("audit_bulk_load_date", "TIMESTAMP"),
    ("audit_latest_delta_load_date", "TIMESTAMP"),
    ("audit_latest_load_operation", "VARCHAR"),
];

/// Classification of a table, derived from its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableKind {
    Dimension,
    Fact,
    Summary,
    Other,
}

impl TableKind {
    /// `dim_*` → dimension, `fct_*`/`fact_*` → fact, `sum_*` → summary.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("dim_") {
            TableKind::Dimension
        } else if lower.starts_with("fct_") || lower.starts_with("fact_") {
            TableKind::Fact
        } else if lower.starts_with("sum_") {
            TableKind::Summary
        } else {
            TableKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Dimension => "DIMENSION",
            TableKind::Fact => "FACT",
            TableKind::Summary => "SUMMARY",
            TableKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a column plays in the dimensional model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    #[default]
    Attribute,
    NaturalKey,
    ForeignKey,
    SurrogateKey,
}

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSchema {
    pub name: ColumnName,

    /// SQL data type, rendered verbatim into DDL
    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub role: ColumnRole,

    /// Referenced dimension, required for foreign keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<TableName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnSchema {
    pub fn new(name: &str, data_type: &str, role: ColumnRole) -> Self {
        Self {
            name: ColumnName::new(name),
            data_type: data_type.to_string(),
            role,
            references: None,
            description: None,
        }
    }

    pub fn foreign_key(name: &str, data_type: &str, references: &str) -> Self {
        Self {
            references: Some(TableName::new(references)),
            ..Self::new(name, data_type, ColumnRole::ForeignKey)
        }
    }
}

/// A manually curated dimension row with a fixed surrogate key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultRow {
    /// Surrogate key; must be zero or negative so it never collides with the sequence
    pub key: i64,

    /// Column values by name; unlisted columns are NULL
    #[serde(default)]
    pub values: BTreeMap<String, serde_yaml::Value>,
}

impl DefaultRow {
    /// The "unknown member" row.
    pub fn sentinel() -> Self {
        Self {
            key: SENTINEL_KEY,
            values: BTreeMap::new(),
        }
    }
}

/// A table in the schema description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSchema {
    pub name: TableName,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Relation feeding this table during LOAD (e.g. `trn.customers`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Source-system identifier written into audit columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,

    pub columns: Vec<ColumnSchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_rows: Vec<DefaultRow>,
}

impl TableSchema {
    pub fn kind(&self) -> TableKind {
        TableKind::from_name(&self.name)
    }

    pub fn is_audit_dimension(&self) -> bool {
        self.name == AUDIT_DIMENSION
    }

    /// Non-fact, non-audit-dimension tables carry the audit columns.
    pub fn has_audit_columns(&self) -> bool {
        self.kind() != TableKind::Fact && !self.is_audit_dimension()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn surrogate_key(&self) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.role == ColumnRole::SurrogateKey)
    }

    pub fn natural_keys(&self) -> Vec<&ColumnSchema> {
        self.columns
            .iter()
            .filter(|c| c.role == ColumnRole::NaturalKey)
            .collect()
    }

    /// Natural-key column names in declaration order.
    pub fn natural_key_names(&self) -> Vec<&str> {
        self.natural_keys().iter().map(|c| c.name.as_str()).collect()
    }

    pub fn foreign_keys(&self) -> Vec<&ColumnSchema> {
        self.columns
            .iter()
            .filter(|c| c.role == ColumnRole::ForeignKey)
            .collect()
    }

    /// Columns written by a load: everything except the surrogate key.
    pub fn loadable_columns(&self) -> Vec<&ColumnSchema> {
        self.columns
            .iter()
            .filter(|c| c.role != ColumnRole::SurrogateKey)
            .collect()
    }

    /// Default rows to insert, always including a sentinel row for dimensions.
    pub fn effective_default_rows(&self) -> Vec<DefaultRow> {
        let mut rows = self.default_rows.clone();
        if self.kind() == TableKind::Dimension && !rows.iter().any(|r| r.key == SENTINEL_KEY) {
            rows.insert(0, DefaultRow::sentinel());
        }
        rows
    }

    fn invalid(&self, message: impl Into<String>) -> CoreError {
        CoreError::SchemaInvalid {
            table: self.name.to_string(),
            message: message.into(),
        }
    }

    /// Validate column roles and default rows of a single table.
    pub fn validate(&self) -> CoreResult<()> {
        if self.columns.is_empty() {
            return Err(self.invalid("table has no columns"));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(self.invalid(format!("duplicate column '{}'", col.name)));
            }
            if col.data_type.trim().is_empty() {
                return Err(self.invalid(format!("column '{}' has no type", col.name)));
            }
            match (col.role, &col.references) {
                (ColumnRole::ForeignKey, None) => {
                    return Err(self.invalid(format!(
                        "foreign key '{}' does not name the dimension it references",
                        col.name
                    )))
                }
                (role, Some(r)) if role != ColumnRole::ForeignKey => {
                    return Err(self.invalid(format!(
                        "column '{}' references '{}' but is not a foreign key",
                        col.name, r
                    )))
                }
                _ => {}
            }
        }

        let sk_count = self
            .columns
            .iter()
            .filter(|c| c.role == ColumnRole::SurrogateKey)
            .count();
        if sk_count > 1 {
            return Err(self.invalid("more than one surrogate-key column"));
        }
        if let Some(sk) = self.surrogate_key() {
            if !is_signed_integer_type(&sk.data_type) {
                return Err(self.invalid(format!(
                    "surrogate key '{}' has type {}; it must be a signed integer type such as BIGINT",
                    sk.name, sk.data_type
                )));
            }
        }

        if self.kind() == TableKind::Dimension {
            if sk_count == 0 {
                return Err(self.invalid("dimension has no surrogate-key column"));
            }
            if self.natural_keys().is_empty() {
                return Err(self.invalid(
                    "dimension has no natural-key columns; surrogate keys cannot be resolved",
                ));
            }
        } else if !self.default_rows.is_empty() {
            return Err(self.invalid("default_rows are only allowed on dimensions"));
        }

        let mut keys = HashSet::new();
        for row in &self.default_rows {
            if row.key > 0 {
                return Err(self.invalid(format!(
                    "default row key {} must be zero or negative",
                    row.key
                )));
            }
            if !keys.insert(row.key) {
                return Err(self.invalid(format!("duplicate default row key {}", row.key)));
            }
            for col in row.values.keys() {
                match self.column(col) {
                    Some(c) if c.role == ColumnRole::SurrogateKey => {
                        return Err(self.invalid(format!(
                            "default row {} sets surrogate key '{}' through values; use `key`",
                            row.key, col
                        )))
                    }
                    Some(_) => {}
                    None => {
                        return Err(self.invalid(format!(
                            "default row {} sets unknown column '{}'",
                            row.key, col
                        )))
                    }
                }
            }
        }

        Ok(())
    }
}

/// Types a sequence-assigned key (and the negative default keys) fit in.
fn is_signed_integer_type(data_type: &str) -> bool {
    matches!(
        data_type.trim().to_ascii_uppercase().as_str(),
        "BIGINT" | "INT8" | "LONG" | "INTEGER" | "INT" | "INT4" | "SIGNED" | "HUGEINT" | "INT128"
    )
}

/// One schema description file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    tables: Vec<TableSchema>,
}

/// The audit dimension referenced by every fact table.
pub fn audit_dimension() -> TableSchema {
    TableSchema {
        name: TableName::new(AUDIT_DIMENSION),
        description: Some("One row per pipeline run that loaded facts".to_string()),
        source: None,
        source_system: None,
        columns: vec![
            ColumnSchema::new(AUDIT_KEY_COLUMN, "BIGINT", ColumnRole::SurrogateKey),
            ColumnSchema::new("run_id", "BIGINT", ColumnRole::NaturalKey),
            ColumnSchema::new("run_mode", "VARCHAR", ColumnRole::Attribute),
            ColumnSchema::new("loaded_at", "TIMESTAMP", ColumnRole::Attribute),
        ],
        default_rows: Vec::new(),
    }
}

/// The full, validated schema model.
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    tables: Vec<TableSchema>,
    index: HashMap<TableName, usize>,
}

impl SchemaModel {
    /// Build a model from table definitions.
    ///
    /// Facts receive the implicit audit foreign key and the audit dimension is
    /// added whenever a fact exists. Cross-table references are validated.
    pub fn from_tables(tables: Vec<TableSchema>) -> CoreResult<Self> {
        let mut tables = tables;
        let has_fact = tables.iter().any(|t| t.kind() == TableKind::Fact);

        for table in tables.iter_mut() {
            if table.kind() == TableKind::Fact && table.column(AUDIT_KEY_COLUMN).is_none() {
                table.columns.push(ColumnSchema::foreign_key(
                    AUDIT_KEY_COLUMN,
                    "BIGINT",
                    AUDIT_DIMENSION,
                ));
            }
        }
        if has_fact && !tables.iter().any(|t| t.is_audit_dimension()) {
            tables.insert(0, audit_dimension());
        }

        let mut index = HashMap::new();
        for (i, table) in tables.iter().enumerate() {
            table.validate()?;
            if index.insert(table.name.clone(), i).is_some() {
                return Err(CoreError::Duplicate {
                    kind: "table".to_string(),
                    name: table.name.to_string(),
                });
            }
        }

        let model = Self { tables, index };
        model.validate_references()?;
        Ok(model)
    }

    fn validate_references(&self) -> CoreResult<()> {
        for table in &self.tables {
            for fk in table.foreign_keys() {
                let Some(target) = &fk.references else {
                    continue;
                };
                match self.get(target) {
                    Some(dim) if dim.kind() == TableKind::Dimension => {}
                    Some(other) => {
                        return Err(CoreError::SchemaInvalid {
                            table: table.name.to_string(),
                            message: format!(
                                "foreign key '{}' references '{}', which is a {} table, not a dimension",
                                fk.name,
                                target,
                                other.kind()
                            ),
                        })
                    }
                    None => {
                        return Err(CoreError::SchemaInvalid {
                            table: table.name.to_string(),
                            message: format!(
                                "foreign key '{}' references undeclared dimension '{}'",
                                fk.name, target
                            ),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse a single YAML document holding a `tables:` list.
    pub fn from_yaml_str(yaml: &str) -> CoreResult<Self> {
        let file: SchemaFile = serde_yaml::from_str(yaml)?;
        Self::from_tables(file.tables)
    }

    /// Load every `*.yml` / `*.yaml` file in the given directories, in name order.
    pub fn load_from_paths(paths: &[PathBuf]) -> CoreResult<Self> {
        let mut tables = Vec::new();
        for dir in paths {
            if !dir.is_dir() {
                log::warn!("Schema path {} is not a directory, skipping", dir.display());
                continue;
            }
            for path in schema_files(dir)? {
                let content = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
                    path: path.display().to_string(),
                    source: e,
                })?;
                let file: SchemaFile =
                    serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                        message: format!("{}: {e}", path.display()),
                    })?;
                log::debug!(
                    "Loaded {} table(s) from {}",
                    file.tables.len(),
                    path.display()
                );
                tables.extend(file.tables);
            }
        }
        Self::from_tables(tables)
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    /// Look up a table, failing with [`CoreError::TableNotFound`].
    pub fn require(&self, name: &str) -> CoreResult<&TableSchema> {
        self.get(name).ok_or_else(|| CoreError::TableNotFound {
            name: name.to_string(),
        })
    }

    pub fn of_kind(&self, kind: TableKind) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter().filter(move |t| t.kind() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn schema_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == "yml" || e == "yaml")
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
