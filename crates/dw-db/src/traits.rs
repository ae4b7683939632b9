//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// A result row with every value rendered as text; `None` is SQL NULL.
pub type Row = Vec<Option<String>>;

/// Database abstraction trait for dwflow
///
/// Implementations must be Send + Sync for async operation. Relation names
/// passed in are already quoted and schema-qualified by the caller.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run statements in order inside one transaction, rolling back on the first failure
    async fn execute_in_transaction(&self, statements: &[String]) -> DbResult<()>;

    /// Create table from SELECT statement
    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Check if a table or view exists in a schema
    async fn relation_exists(&self, schema: &str, table: &str) -> DbResult<bool>;

    /// Column names of a relation, in ordinal order
    async fn column_names(&self, schema: &str, table: &str) -> DbResult<Vec<String>>;

    /// Tables and views of a schema, sorted by name
    async fn list_tables(&self, schema: &str) -> DbResult<Vec<String>>;

    /// Execute query returning row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// First column of the first row as an integer; `None` when empty or NULL
    async fn query_i64(&self, sql: &str) -> DbResult<Option<i64>>;

    /// All rows of a query rendered as text
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Row>>;

    /// Drop a table or view if it exists
    async fn drop_if_exists(&self, name: &str) -> DbResult<()>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;

    /// Whether `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` is available
    fn supports_foreign_key_alter(&self) -> bool;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
