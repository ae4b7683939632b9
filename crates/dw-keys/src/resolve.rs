//! Foreign-key resolution against key maps.

use crate::dataset::FactDataset;
use crate::error::{KeyError, KeyResult};
use crate::keymap::{KeyMap, KEYMAP_NK_COLUMN, KEYMAP_SK_COLUMN};
use dw_core::sql_utils::{natural_key_expr, qualify, quote_ident};
use dw_core::SENTINEL_KEY;
use dw_db::Database;

/// Outcome of resolving one foreign-key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveStats {
    pub rows: usize,
    /// Rows that received the sentinel key
    pub unmatched: usize,
}

/// Set `fk_column` on every dataset row to the surrogate key its natural key
/// maps to, or to the sentinel key when nothing matches.
///
/// The dataset must carry every natural-key column of the key map's
/// dimension. An existing `fk_column` is replaced. Rows are never dropped or
/// duplicated: the key map holds each natural key at most once.
pub async fn resolve_foreign_key(
    db: &dyn Database,
    dataset: &FactDataset,
    fk_column: &str,
    keymap: &KeyMap,
) -> KeyResult<ResolveStats> {
    let columns = dataset.columns(db).await?;
    for nk in keymap.natural_keys() {
        if !columns.iter().any(|c| c == nk) {
            return Err(KeyError::MissingNaturalKeyColumn {
                dataset: dataset.table().to_string(),
                column: nk.clone(),
                dimension: keymap.dimension().to_string(),
            });
        }
    }

    let before = dataset.row_count(db).await?;

    let mut select: Vec<String> = columns
        .iter()
        .filter(|c| c.as_str() != fk_column)
        .map(|c| format!("f.{}", quote_ident(c)))
        .collect();
    select.push(format!(
        "COALESCE(km.{}, {SENTINEL_KEY}) AS {}",
        quote_ident(KEYMAP_SK_COLUMN),
        quote_ident(fk_column)
    ));
    let nk_refs: Vec<&str> = keymap.natural_keys().iter().map(String::as_str).collect();

    let scratch_table = format!("{}__{}", dataset.table(), fk_column);
    let scratch = qualify(dataset.schema(), &scratch_table);
    db.create_table_as(
        &scratch,
        &format!(
            "SELECT {} FROM {} f LEFT JOIN {} km ON {} = km.{}",
            select.join(", "),
            dataset.relation(),
            keymap.relation(),
            natural_key_expr(Some("f"), &nk_refs),
            quote_ident(KEYMAP_NK_COLUMN)
        ),
        true,
    )
    .await?;
    db.execute_in_transaction(&[
        format!("DROP TABLE {}", dataset.relation()),
        format!(
            "ALTER TABLE {scratch} RENAME TO {}",
            quote_ident(dataset.table())
        ),
    ])
    .await?;

    let after = dataset.row_count(db).await?;
    if after != before {
        return Err(KeyError::RowCountChanged {
            dataset: dataset.table().to_string(),
            column: fk_column.to_string(),
            before,
            after,
        });
    }

    let unmatched = db
        .query_count(&format!(
            "SELECT * FROM {} WHERE {} = {SENTINEL_KEY}",
            dataset.relation(),
            quote_ident(fk_column)
        ))
        .await?;
    log::debug!(
        "Resolved {}.{fk_column} via {}: {after} row(s), {unmatched} unmatched",
        dataset.table(),
        keymap.dimension()
    );
    Ok(ResolveStats {
        rows: after,
        unmatched,
    })
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod tests;
