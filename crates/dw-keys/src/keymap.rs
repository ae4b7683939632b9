//! Natural-key → surrogate-key maps.

use crate::error::{KeyError, KeyResult};
use dw_core::sql_utils::{natural_key_expr, qualify, quote_ident, string_literal};
use dw_core::{Layers, TableKind, TableSchema, SENTINEL_KEY};
use dw_db::Database;

/// Surrogate-key column of a persisted key map.
pub const KEYMAP_SK_COLUMN: &str = "sk";

/// Concatenated natural-key column of a persisted key map.
pub const KEYMAP_NK_COLUMN: &str = "nk";

/// A persisted `{sk, nk}` map for one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    dimension: String,
    relation: String,
    natural_keys: Vec<String>,
    len: usize,
}

impl KeyMap {
    fn table_name(dimension: &str) -> String {
        format!("km_{dimension}")
    }

    fn check_dimension(dim: &TableSchema) -> KeyResult<(String, Vec<String>)> {
        let invalid = |message: &str| KeyError::InvalidDimension {
            table: dim.name.to_string(),
            message: message.to_string(),
        };
        if dim.kind() != TableKind::Dimension {
            return Err(invalid("not a dimension"));
        }
        let sk = dim
            .surrogate_key()
            .ok_or_else(|| invalid("no surrogate-key column"))?;
        let nks: Vec<String> = dim
            .natural_key_names()
            .into_iter()
            .map(String::from)
            .collect();
        if nks.is_empty() {
            return Err(invalid("no natural-key columns"));
        }
        Ok((sk.name.to_string(), nks))
    }

    /// Build the key map of a persisted dimension.
    ///
    /// Reads `{sk, nk...}` from the dimension table in the warehouse layer,
    /// concatenates the natural-key columns in declared order and stores the
    /// result in the keymap layer. The sentinel row is left out: unmatched
    /// facts receive the sentinel key anyway. A natural key shared by two
    /// rows is an error.
    pub async fn build(db: &dyn Database, layers: &Layers, dim: &TableSchema) -> KeyResult<Self> {
        let (sk, nks) = Self::check_dimension(dim)?;
        let nk_refs: Vec<&str> = nks.iter().map(String::as_str).collect();
        let relation = qualify(&layers.keymap, &Self::table_name(&dim.name));
        let source = qualify(layers.for_kind(TableKind::Dimension), &dim.name);

        db.create_table_as(
            &relation,
            &format!(
                "SELECT d.{sk_col} AS {sk_out}, {nk_expr} AS {nk_out} FROM {source} d WHERE d.{sk_col} <> {SENTINEL_KEY}",
                sk_col = quote_ident(&sk),
                sk_out = quote_ident(KEYMAP_SK_COLUMN),
                nk_expr = natural_key_expr(Some("d"), &nk_refs),
                nk_out = quote_ident(KEYMAP_NK_COLUMN),
            ),
            true,
        )
        .await?;

        let duplicates = db
            .query_rows(&format!(
                "SELECT {nk} FROM {relation} GROUP BY {nk} HAVING COUNT(*) > 1 ORDER BY {nk} LIMIT 1",
                nk = quote_ident(KEYMAP_NK_COLUMN)
            ))
            .await?;
        if let Some(row) = duplicates.into_iter().next() {
            db.drop_if_exists(&relation).await?;
            return Err(KeyError::DuplicateNaturalKey {
                dimension: dim.name.to_string(),
                natural_key: row.into_iter().next().flatten().unwrap_or_default(),
            });
        }

        let len = db
            .query_count(&format!("SELECT * FROM {relation}"))
            .await?;
        log::debug!("Built key map for {} with {len} entr(y/ies)", dim.name);
        Ok(Self {
            dimension: dim.name.to_string(),
            relation,
            natural_keys: nks,
            len,
        })
    }

    /// Open the persisted key map of a dimension.
    pub async fn open(db: &dyn Database, layers: &Layers, dim: &TableSchema) -> KeyResult<Self> {
        let (_, nks) = Self::check_dimension(dim)?;
        let table = Self::table_name(&dim.name);
        if !db.relation_exists(&layers.keymap, &table).await? {
            return Err(KeyError::MissingKeyMap {
                dimension: dim.name.to_string(),
            });
        }
        let relation = qualify(&layers.keymap, &table);
        let len = db
            .query_count(&format!("SELECT * FROM {relation}"))
            .await?;
        Ok(Self {
            dimension: dim.name.to_string(),
            relation,
            natural_keys: nks,
            len,
        })
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// Quoted relation holding `{sk, nk}`.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Natural-key columns of the dimension, in concatenation order.
    pub fn natural_keys(&self) -> &[String] {
        &self.natural_keys
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Surrogate key for a concatenated natural key, if mapped.
    pub async fn lookup(&self, db: &dyn Database, natural_key: &str) -> KeyResult<Option<i64>> {
        Ok(db
            .query_i64(&format!(
                "SELECT {} FROM {} WHERE {} = {}",
                quote_ident(KEYMAP_SK_COLUMN),
                self.relation,
                quote_ident(KEYMAP_NK_COLUMN),
                string_literal(natural_key)
            ))
            .await?)
    }
}

/// Drop every key map; called once a run completes successfully.
pub async fn discard_key_maps(db: &dyn Database, layers: &Layers) -> KeyResult<usize> {
    let tables = db.list_tables(&layers.keymap).await?;
    for table in &tables {
        db.drop_if_exists(&qualify(&layers.keymap, table)).await?;
    }
    if !tables.is_empty() {
        log::debug!("Discarded {} key map(s)", tables.len());
    }
    Ok(tables.len())
}

#[cfg(test)]
#[path = "keymap_test.rs"]
mod tests;
