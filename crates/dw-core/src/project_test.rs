use super::*;
use std::fs;

fn write_project(dir: &Path) {
    fs::write(
        dir.join("dwflow.yml"),
        r#"
name: retail
transforms:
  - name: orders
    sql: transforms/orders.sql
    depends_on: [customers]
  - name: customers
    sql: transforms/customers.sql
summaries:
  - name: sum_sales
    sql: summaries/sum_sales.sql
"#,
    )
    .unwrap();

    fs::create_dir_all(dir.join("transforms")).unwrap();
    fs::create_dir_all(dir.join("summaries")).unwrap();
    fs::create_dir_all(dir.join("schema")).unwrap();
    fs::write(
        dir.join("transforms/customers.sql"),
        "SELECT * FROM {{ layers.extract }}.erp_customers;\n",
    )
    .unwrap();
    fs::write(
        dir.join("transforms/orders.sql"),
        "SELECT * FROM {{ layers.extract }}.erp_orders",
    )
    .unwrap();
    fs::write(
        dir.join("summaries/sum_sales.sql"),
        "SELECT 1 AS total",
    )
    .unwrap();
    fs::write(
        dir.join("schema/retail.yml"),
        r#"
tables:
  - name: dim_customer
    columns:
      - { name: customer_sk, type: BIGINT, role: surrogate_key }
      - { name: customer_code, type: VARCHAR, role: natural_key }
"#,
    )
    .unwrap();
}

#[test]
fn test_load_project() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let project = Project::load(dir.path()).unwrap();
    assert_eq!(project.config.name, "retail");
    assert!(project.schema.get("dim_customer").is_some());

    let order: Vec<&str> = project.transforms.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(order, vec!["customers", "orders"]);
    // trailing semicolon is stripped
    assert_eq!(
        project.transforms[0].sql,
        "SELECT * FROM {{ layers.extract }}.erp_customers"
    );
    assert_eq!(project.summaries.len(), 1);
    assert_eq!(project.target_dir(), dir.path().join("target"));
}

#[test]
fn test_missing_project_dir() {
    let result = Project::load(Path::new("/definitely/not/here"));
    assert!(matches!(result, Err(CoreError::ProjectNotFound { .. })));
}

#[test]
fn test_missing_sql_file() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    fs::remove_file(dir.path().join("transforms/orders.sql")).unwrap();

    let result = Project::load(dir.path());
    assert!(matches!(result, Err(CoreError::IoWithPath { .. })));
}

#[test]
fn test_empty_sql_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    fs::write(dir.path().join("summaries/sum_sales.sql"), " ; \n").unwrap();

    let err = Project::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains("empty SQL file"));
}

#[test]
fn test_resolve_path() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let project = Project::load(dir.path()).unwrap();
    assert_eq!(project.resolve_path("data/erp"), dir.path().join("data/erp"));
    assert_eq!(
        project.resolve_path("/abs/file.duckdb"),
        PathBuf::from("/abs/file.duckdb")
    );
}
