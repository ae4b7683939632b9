//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::row_helpers::{read_row, value_to_i64};
use crate::traits::{Database, Row};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::Connection;
use dw_core::sql_utils::string_literal;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::ConnectionError(format!("{e}: {}", parent.display())))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        log::debug!("SQL: {sql}");
        conn.execute(sql, []).map_err(|e| {
            let classified = DbError::from(e);
            match classified {
                DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{msg}: {sql}")),
                other => other,
            }
        })
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        log::debug!("SQL batch: {sql}");
        conn.execute_batch(sql).map_err(DbError::from)
    }

    fn execute_in_transaction_sync(&self, statements: &[String]) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = statements.iter().try_for_each(|sql| {
            log::debug!("SQL (tx): {sql}");
            conn.execute_batch(sql)
                .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
        });

        match result {
            Ok(()) => conn.execute_batch("COMMIT").map_err(|commit_err| {
                let _ = conn.execute_batch("ROLLBACK");
                DbError::TransactionError(format!("COMMIT failed: {commit_err}"))
            }),
            Err(e) => {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                    log::warn!("ROLLBACK failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    /// Query rows synchronously
    fn query_rows_sync(&self, sql: &str) -> DbResult<Vec<Row>> {
        let conn = self.lock()?;
        log::debug!("SQL query: {sql}");
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_i64_sync(&self, sql: &str) -> DbResult<Option<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(value_to_i64(row.get::<_, Value>(0)?)),
            None => Ok(None),
        }
    }

    /// Query count synchronously
    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM ({sql})"), [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn execute_in_transaction(&self, statements: &[String]) -> DbResult<()> {
        self.execute_in_transaction_sync(statements)
    }

    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let sql = if replace {
            format!("CREATE OR REPLACE TABLE {name} AS {select}")
        } else {
            format!("CREATE TABLE {name} AS {select}")
        };
        self.execute_sync(&sql)?;
        Ok(())
    }

    async fn relation_exists(&self, schema: &str, table: &str) -> DbResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = {} AND table_name = {}",
            string_literal(schema),
            string_literal(table)
        );
        Ok(self.query_i64_sync(&sql)?.unwrap_or(0) > 0)
    }

    async fn column_names(&self, schema: &str, table: &str) -> DbResult<Vec<String>> {
        let sql = format!(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
            string_literal(schema),
            string_literal(table)
        );
        let names: Vec<String> = self
            .query_rows_sync(&sql)?
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect();
        if names.is_empty() {
            return Err(DbError::TableNotFound(format!("{schema}.{table}")));
        }
        Ok(names)
    }

    async fn list_tables(&self, schema: &str) -> DbResult<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = {} ORDER BY table_name",
            string_literal(schema)
        );
        Ok(self
            .query_rows_sync(&sql)?
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn query_i64(&self, sql: &str) -> DbResult<Option<i64>> {
        self.query_i64_sync(sql)
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Row>> {
        self.query_rows_sync(sql)
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        // DuckDB refuses DROP VIEW on a table and vice versa
        let _ = self.execute_sync(&format!("DROP VIEW IF EXISTS {name}"));
        let _ = self.execute_sync(&format!("DROP TABLE IF EXISTS {name}"));
        Ok(())
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
        self.execute_sync(&sql)?;
        Ok(())
    }

    fn supports_foreign_key_alter(&self) -> bool {
        false
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
