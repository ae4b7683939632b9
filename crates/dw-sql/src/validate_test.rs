use super::*;

#[test]
fn test_select_accepted() {
    let stmt = validate_query("customers", "SELECT id, name FROM ext.erp_customers").unwrap();
    assert!(matches!(stmt, Statement::Query(_)));
}

#[test]
fn test_cte_and_duckdb_syntax_accepted() {
    let sql = r#"
WITH latest AS (
    SELECT * EXCLUDE (loaded_at) FROM "ext"."erp_orders"
)
SELECT order_id, customer_code, amount::DECIMAL(12,2) AS amount FROM latest
"#;
    validate_query("orders", sql).unwrap();
}

#[test]
fn test_trailing_semicolon_is_one_statement() {
    validate_query("x", "SELECT 1;").unwrap();
}

#[test]
fn test_empty_sql() {
    assert!(matches!(
        validate_query("x", "  \n "),
        Err(SqlError::EmptySql(_))
    ));
}

#[test]
fn test_multiple_statements_rejected() {
    let err = validate_query("x", "SELECT 1; SELECT 2").unwrap_err();
    assert!(matches!(
        err,
        SqlError::MultipleStatements { count: 2, .. }
    ));
}

#[test]
fn test_non_query_rejected() {
    let err = validate_query("x", "DELETE FROM dwh.dim_customer").unwrap_err();
    match err {
        SqlError::NotAQuery { step, kind } => {
            assert_eq!(step, "x");
            assert_eq!(kind, "DELETE");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_parse_error_names_step() {
    let err = validate_query("broken", "SELECT (1 + FROM t").unwrap_err();
    match err {
        SqlError::ParseError { step, message, .. } => {
            assert_eq!(step, "broken");
            assert!(!message.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_location_extraction() {
    assert_eq!(
        parse_location_from_error("Expected: an expression, found: FROM at Line: 2, Column: 1"),
        (2, 1)
    );
    assert_eq!(parse_location_from_error("no location"), (0, 0));
}
