//! Extraction sources.
//!
//! Every source kind is read through the [`TableSource`] capability. A source
//! does not move data itself: it hands back a relation expression the
//! warehouse connection can `SELECT` from, so extraction is a single
//! `CREATE TABLE ... AS SELECT` inside DuckDB.

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use dw_core::config::{SourceConfig, SourceKind};
use dw_core::sql_utils::{quote_ident, string_literal};
use std::path::{Path, PathBuf};

/// A column reported by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    pub data_type: String,
}

/// Capability shared by every extraction source kind.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Source name from the project config
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Tables this source can provide, sorted by name
    async fn list_tables(&self, db: &dyn Database) -> DbResult<Vec<String>>;

    /// Relation expression reading one table, usable in a FROM clause
    async fn read_table(&self, db: &dyn Database, table: &str) -> DbResult<String>;

    /// Column names and types of one table
    async fn schema_of(&self, db: &dyn Database, table: &str) -> DbResult<Vec<SourceColumn>> {
        let relation = self.read_table(db, table).await?;
        let rows = db
            .query_rows(&format!("DESCRIBE SELECT * FROM {relation}"))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let mut it = row.into_iter();
                let name = it.next().flatten()?;
                let data_type = it.next().flatten().unwrap_or_default();
                Some(SourceColumn { name, data_type })
            })
            .collect())
    }
}

/// Build the source implementation for a configured source.
pub fn source_for(config: &SourceConfig, project_root: &Path) -> Box<dyn TableSource> {
    let path = if Path::new(&config.path).is_absolute() {
        PathBuf::from(&config.path)
    } else {
        project_root.join(&config.path)
    };
    match config.kind {
        SourceKind::Csv | SourceKind::Parquet => {
            Box::new(FileSource::new(config.name.as_str(), config.kind, path))
        }
        SourceKind::DuckDb => Box::new(DuckDbSource::new(
            config.name.as_str(),
            path,
            config.schema.as_deref().unwrap_or("main"),
        )),
    }
}

/// A directory of `<table>.csv` or `<table>.parquet` files.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    kind: SourceKind,
    dir: PathBuf,
}

impl FileSource {
    pub fn new(name: &str, kind: SourceKind, dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            kind,
            dir,
        }
    }

    fn extension(&self) -> &'static str {
        match self.kind {
            SourceKind::Parquet => "parquet",
            SourceKind::Csv | SourceKind::DuckDb => "csv",
        }
    }

    fn error(&self, message: impl Into<String>) -> DbError {
        DbError::SourceError {
            source_name: self.name.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl TableSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn list_tables(&self, _db: &dyn Database) -> DbResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| self.error(format!("{e}: {}", self.dir.display())))?;
        let ext = self.extension();
        let mut tables: Vec<String> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == ext))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        tables.sort();
        Ok(tables)
    }

    async fn read_table(&self, _db: &dyn Database, table: &str) -> DbResult<String> {
        let file = self.dir.join(format!("{table}.{}", self.extension()));
        if !file.is_file() {
            return Err(DbError::TableNotFound(format!(
                "{} (source '{}')",
                file.display(),
                self.name
            )));
        }
        let literal = string_literal(&file.display().to_string());
        Ok(match self.kind {
            SourceKind::Parquet => format!("read_parquet({literal})"),
            SourceKind::Csv | SourceKind::DuckDb => format!("read_csv_auto({literal})"),
        })
    }
}

/// Tables of a schema inside another DuckDB database file.
///
/// The file is attached read-only under an alias derived from the source name
/// the first time it is read.
#[derive(Debug, Clone)]
pub struct DuckDbSource {
    name: String,
    path: PathBuf,
    schema: String,
    alias: String,
}

impl DuckDbSource {
    pub fn new(name: &str, path: PathBuf, schema: &str) -> Self {
        Self {
            name: name.to_string(),
            path,
            schema: schema.to_string(),
            alias: format!("src_{name}"),
        }
    }

    async fn attach(&self, db: &dyn Database) -> DbResult<()> {
        if !self.path.is_file() {
            return Err(DbError::SourceError {
                source_name: self.name.clone(),
                message: format!("database file not found: {}", self.path.display()),
            });
        }
        db.execute_batch(&format!(
            "ATTACH IF NOT EXISTS {} AS {} (READ_ONLY)",
            string_literal(&self.path.display().to_string()),
            quote_ident(&self.alias)
        ))
        .await
    }
}

#[async_trait]
impl TableSource for DuckDbSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::DuckDb
    }

    async fn list_tables(&self, db: &dyn Database) -> DbResult<Vec<String>> {
        self.attach(db).await?;
        let rows = db
            .query_rows(&format!(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_catalog = {} AND table_schema = {} ORDER BY table_name",
                string_literal(&self.alias),
                string_literal(&self.schema)
            ))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    async fn read_table(&self, db: &dyn Database, table: &str) -> DbResult<String> {
        self.attach(db).await?;
        Ok(format!(
            "{}.{}.{}",
            quote_ident(&self.alias),
            quote_ident(&self.schema),
            quote_ident(table)
        ))
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
