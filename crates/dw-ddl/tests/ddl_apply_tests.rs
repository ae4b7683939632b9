//! Apply generated plans to a real DuckDB warehouse.

use dw_core::{Layers, SchemaModel};
use dw_db::{Database, DuckDbBackend};
use dw_ddl::{apply_plan, AuditValues, DdlKind, PhysicalModelBuilder};

const MODEL: &str = r#"
tables:
  - name: dim_customer
    columns:
      - { name: customer_sk, type: BIGINT, role: surrogate_key }
      - { name: customer_code, type: VARCHAR, role: natural_key }
      - { name: customer_name, type: VARCHAR }
  - name: fct_orders
    columns:
      - { name: order_id, type: VARCHAR, role: natural_key }
      - { name: customer_sk, type: BIGINT, role: foreign_key, references: dim_customer }
      - { name: amount, type: "DECIMAL(12,2)" }
"#;

#[tokio::test]
async fn full_rebuild_applies_and_is_repeatable() {
    let model = SchemaModel::from_yaml_str(MODEL).unwrap();
    let layers = Layers::default();
    let builder = PhysicalModelBuilder::new(&model, &layers);
    let plan = builder.full_rebuild_plan().unwrap();
    let db = DuckDbBackend::in_memory().unwrap();

    let first = apply_plan(&db, &plan).await.unwrap();
    let fk_count = plan.iter().filter(|s| s.kind.is_foreign_key()).count();
    assert_eq!(first.skipped, fk_count);
    assert_eq!(first.executed + first.skipped, plan.len());

    // a second rebuild drops and recreates cleanly
    apply_plan(&db, &plan).await.unwrap();

    assert!(db.relation_exists("dwh", "dim_customer").await.unwrap());
    assert!(db.relation_exists("dwh", "dim_audit").await.unwrap());
    assert!(db.relation_exists("dwh", "fct_orders").await.unwrap());
    assert_eq!(
        db.column_names("dwh", "fct_orders").await.unwrap(),
        vec!["order_id", "customer_sk", "amount", "audit_key"]
    );
}

#[tokio::test]
async fn surrogate_keys_come_from_sequence() {
    let model = SchemaModel::from_yaml_str(MODEL).unwrap();
    let layers = Layers::default();
    let builder = PhysicalModelBuilder::new(&model, &layers);
    let db = DuckDbBackend::in_memory().unwrap();
    apply_plan(&db, &builder.full_rebuild_plan().unwrap())
        .await
        .unwrap();

    let dim = builder.table("dim_customer").unwrap();
    let audit = AuditValues {
        source_system: "erp".to_string(),
        load_timestamp: "2024-01-01 00:00:00".to_string(),
        operation: "INSERT".to_string(),
    };
    for stmt in builder.default_row_statements(dim, &audit) {
        assert_eq!(stmt.kind, DdlKind::InsertDefaultRow);
        db.execute(&stmt.sql).await.unwrap();
    }
    db.execute(
        r#"INSERT INTO "dwh"."dim_customer" (customer_code, customer_name) VALUES ('C1', 'Alice'), ('C2', 'Bob')"#,
    )
    .await
    .unwrap();

    let rows = db
        .query_rows(r#"SELECT customer_sk, customer_code FROM "dwh"."dim_customer" ORDER BY customer_sk"#)
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Some("-1".to_string()), None],
            vec![Some("1".to_string()), Some("C1".to_string())],
            vec![Some("2".to_string()), Some("C2".to_string())],
        ]
    );

    // the unique index rejects a duplicate key
    assert!(db
        .execute(r#"INSERT INTO "dwh"."dim_customer" (customer_sk, customer_code) VALUES (1, 'X')"#)
        .await
        .is_err());
}
