//! SQL identifier quoting and literal helpers
//!
//! Every statement dwflow generates is assembled from these helpers so that
//! identifiers are always quoted and string literals always escaped.

/// Separator placed between natural-key components in a concatenated key.
pub const NATURAL_KEY_SEPARATOR: &str = "_";

/// Quote a SQL identifier to prevent injection.
///
/// # Examples
/// ```
/// use dw_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("users"), r#""users""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a schema-qualified relation: `"schema"."table"`.
///
/// # Examples
/// ```
/// use dw_core::sql_utils::qualify;
/// assert_eq!(qualify("dwh", "dim_customer"), r#""dwh"."dim_customer""#);
/// ```
pub fn qualify(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Escape a SQL string literal value by doubling single quotes.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a single-quoted SQL string literal.
pub fn string_literal(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}

/// Render a YAML scalar as a SQL literal (used for curated default rows).
pub fn yaml_literal(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => "NULL".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string().to_uppercase(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => string_literal(s),
        other => string_literal(&serde_yaml::to_string(other).unwrap_or_default()),
    }
}

/// SQL expression concatenating natural-key columns into one string.
///
/// Components are cast to VARCHAR, NULL renders as the empty string, and the
/// components are joined with [`NATURAL_KEY_SEPARATOR`] in the given order.
pub fn natural_key_expr(qualifier: Option<&str>, columns: &[&str]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|col| {
            let col_ref = match qualifier {
                Some(q) => format!("{}.{}", quote_ident(q), quote_ident(col)),
                None => quote_ident(col),
            };
            format!("COALESCE(CAST({col_ref} AS VARCHAR), '')")
        })
        .collect();
    if parts.is_empty() {
        return "''".to_string();
    }
    parts.join(&format!(" || '{NATURAL_KEY_SEPARATOR}' || "))
}
