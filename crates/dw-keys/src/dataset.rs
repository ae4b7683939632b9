//! Fact datasets staged for key resolution.

use crate::error::KeyResult;
use dw_core::sql_utils::qualify;
use dw_core::{Layers, TableSchema};
use dw_db::Database;

/// A fact's incoming rows, materialised in the staging layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactDataset {
    schema: String,
    table: String,
}

impl FactDataset {
    /// Materialise `select` as the staging dataset of `fact`, replacing any
    /// leftover from an earlier attempt.
    pub async fn stage(
        db: &dyn Database,
        layers: &Layers,
        fact: &TableSchema,
        select: &str,
    ) -> KeyResult<Self> {
        let dataset = Self {
            schema: layers.staging.clone(),
            table: fact.name.to_string(),
        };
        db.create_table_as(&dataset.relation(), select, true).await?;
        Ok(dataset)
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn relation(&self) -> String {
        qualify(&self.schema, &self.table)
    }

    pub async fn columns(&self, db: &dyn Database) -> KeyResult<Vec<String>> {
        Ok(db.column_names(&self.schema, &self.table).await?)
    }

    pub async fn row_count(&self, db: &dyn Database) -> KeyResult<usize> {
        Ok(db
            .query_count(&format!("SELECT * FROM {}", self.relation()))
            .await?)
    }

    /// Remove the staging table.
    pub async fn discard(self, db: &dyn Database) -> KeyResult<()> {
        db.drop_if_exists(&self.relation()).await?;
        Ok(())
    }
}
