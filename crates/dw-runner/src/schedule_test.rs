use super::*;
use dw_db::DuckDbBackend;
use std::fs;
use std::path::Path;

fn dim(name: &str) -> PlannedUnit {
    PlannedUnit::new(UnitKind::LoadDimension {
        table: TableName::new(name),
    })
}

fn fact(name: &str) -> PlannedUnit {
    PlannedUnit::new(UnitKind::LoadFact {
        table: TableName::new(name),
    })
}

fn transform(name: &str) -> PlannedUnit {
    PlannedUnit::new(UnitKind::Transform {
        step: TableName::new(name),
    })
}

fn summary(name: &str) -> PlannedUnit {
    PlannedUnit::new(UnitKind::Summarise {
        step: TableName::new(name),
    })
}

fn extract(source: &str, table: &str) -> PlannedUnit {
    PlannedUnit::new(UnitKind::Extract {
        source: TableName::new(source),
        table: TableName::new(table),
    })
}

#[test]
fn test_unit_names() {
    assert_eq!(extract("erp", "customers").name, "extract_erp_customers");
    assert_eq!(transform("customers").name, "transform_customers");
    assert_eq!(dim("dim_customer").name, "load_dim_customer");
    assert_eq!(summary("sum_sales").name, "summarise_sum_sales");
    assert_eq!(
        PlannedUnit::new(UnitKind::RebuildPhysicalModel).name,
        REBUILD_UNIT
    );
}

#[test]
fn test_stages_run_in_order() {
    let schedule = construct_schedule(
        vec![
            summary("sum_sales"),
            fact("fct_orders"),
            transform("customers"),
            extract("erp", "customers"),
        ],
        &StageSet::all(),
    )
    .unwrap();
    assert_eq!(
        schedule.names(),
        vec![
            "extract_erp_customers",
            "transform_customers",
            "load_fct_orders",
            "summarise_sum_sales"
        ]
    );
}

#[test]
fn test_dimensions_before_facts() {
    let schedule = construct_schedule(
        vec![
            fact("fct_orders"),
            dim("dim_customer"),
            fact("fct_returns"),
            dim("dim_product"),
        ],
        &StageSet::all(),
    )
    .unwrap();
    assert_eq!(
        schedule.names(),
        vec![
            "load_dim_customer",
            "load_dim_product",
            "load_fct_orders",
            "load_fct_returns"
        ]
    );
}

#[test]
fn test_rebuild_first_in_load() {
    let schedule = construct_schedule(
        vec![
            dim("dim_customer"),
            PlannedUnit::new(UnitKind::RebuildPhysicalModel),
            transform("customers"),
        ],
        &StageSet::all(),
    )
    .unwrap();
    assert_eq!(
        schedule.names(),
        vec!["transform_customers", REBUILD_UNIT, "load_dim_customer"]
    );
}

#[test]
fn test_stage_filtering() {
    let stages = StageSet::parse("transform,summarise").unwrap();
    let schedule = construct_schedule(
        vec![
            extract("erp", "customers"),
            transform("customers"),
            dim("dim_customer"),
            summary("sum_sales"),
        ],
        &stages,
    )
    .unwrap();
    assert_eq!(
        schedule.names(),
        vec!["transform_customers", "summarise_sum_sales"]
    );
    assert!(!schedule.contains("load_dim_customer"));
}

#[test]
fn test_duplicate_unit_rejected() {
    let result = construct_schedule(
        vec![dim("dim_customer"), dim("dim_customer")],
        &StageSet::all(),
    );
    assert!(matches!(result, Err(RunnerError::DuplicateUnit(name)) if name == "load_dim_customer"));
}

#[test]
fn test_empty_schedule() {
    let schedule = construct_schedule(Vec::new(), &StageSet::all()).unwrap();
    assert!(schedule.is_empty());
    assert!(schedule.to_new_units().is_empty());
}

#[test]
fn test_new_units_carry_stage() {
    let schedule = construct_schedule(
        vec![transform("customers"), dim("dim_customer")],
        &StageSet::all(),
    )
    .unwrap();
    let units = schedule.to_new_units();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].stage, Stage::Transform);
    assert_eq!(units[1].stage, Stage::Load);
}

fn write_project(dir: &Path) {
    fs::write(
        dir.join("dwflow.yml"),
        r#"
name: retail
sources:
  - name: erp
    kind: csv
    path: data
    tables: [orders, customers]
transforms:
  - name: orders
    sql: orders.sql
summaries:
  - name: sum_sales
    sql: sum_sales.sql
"#,
    )
    .unwrap();
    fs::write(dir.join("orders.sql"), "SELECT 1 AS id").unwrap();
    fs::write(dir.join("sum_sales.sql"), "SELECT 1 AS total").unwrap();
    fs::create_dir_all(dir.join("schema")).unwrap();
    fs::write(
        dir.join("schema/model.yml"),
        r#"
tables:
  - name: fct_orders
    columns:
      - { name: order_id, type: VARCHAR, role: natural_key }
      - { name: customer_sk, type: BIGINT, role: foreign_key, references: dim_customer }
  - name: dim_customer
    columns:
      - { name: customer_sk, type: BIGINT, role: surrogate_key }
      - { name: customer_code, type: VARCHAR, role: natural_key }
"#,
    )
    .unwrap();
}

#[tokio::test]
async fn test_declare_units_in_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let project = Project::load(dir.path()).unwrap();
    let db = DuckDbBackend::in_memory().unwrap();

    let declared = declare_units(&project, &db, false).await.unwrap();
    let names: Vec<&str> = declared.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "extract_erp_orders",
            "extract_erp_customers",
            "transform_orders",
            "load_dim_audit",
            "load_fct_orders",
            "load_dim_customer",
            "summarise_sum_sales"
        ]
    );

    let schedule = construct_schedule(
        declare_units(&project, &db, true).await.unwrap(),
        &StageSet::all(),
    )
    .unwrap();
    assert_eq!(
        schedule.names(),
        vec![
            "extract_erp_orders",
            "extract_erp_customers",
            "transform_orders",
            REBUILD_UNIT,
            "load_dim_audit",
            "load_dim_customer",
            "load_fct_orders",
            "summarise_sum_sales"
        ]
    );
}
