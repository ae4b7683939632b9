//! Shared warehouse fixture for unit tests.

use dw_core::{Layers, SchemaModel};
use dw_db::{Database, DuckDbBackend};
use dw_ddl::{apply_plan, AuditValues, PhysicalModelBuilder};

pub const MODEL: &str = r#"
tables:
  - name: dim_customer
    columns:
      - { name: customer_sk, type: BIGINT, role: surrogate_key }
      - { name: customer_code, type: VARCHAR, role: natural_key }
      - { name: customer_name, type: VARCHAR }
    default_rows:
      - key: -2
        values: { customer_code: "N/A", customer_name: "Not applicable" }
  - name: dim_product
    columns:
      - { name: product_sk, type: BIGINT, role: surrogate_key }
      - { name: store, type: VARCHAR, role: natural_key }
      - { name: sku, type: VARCHAR, role: natural_key }
  - name: fct_orders
    columns:
      - { name: order_id, type: VARCHAR, role: natural_key }
      - { name: customer_sk, type: BIGINT, role: foreign_key, references: dim_customer }
      - { name: product_sk, type: BIGINT, role: foreign_key, references: dim_product }
      - { name: amount, type: "DECIMAL(12,2)" }
"#;

pub struct Warehouse {
    pub db: DuckDbBackend,
    pub model: SchemaModel,
    pub layers: Layers,
}

/// Built physical model with default rows but no data rows.
pub async fn warehouse() -> Warehouse {
    let model = SchemaModel::from_yaml_str(MODEL).unwrap();
    let layers = Layers::default();
    let db = DuckDbBackend::in_memory().unwrap();
    let builder = PhysicalModelBuilder::new(&model, &layers);
    apply_plan(&db, &builder.full_rebuild_plan().unwrap())
        .await
        .unwrap();
    let audit = AuditValues {
        source_system: "test".to_string(),
        load_timestamp: "2024-01-01 00:00:00".to_string(),
        operation: "INSERT".to_string(),
    };
    for table in model.tables() {
        for stmt in builder.default_row_statements(table, &audit) {
            db.execute(&stmt.sql).await.unwrap();
        }
    }
    Warehouse { db, model, layers }
}

pub async fn insert_customers(db: &DuckDbBackend, codes: &[&str]) {
    for code in codes {
        db.execute(&format!(
            r#"INSERT INTO "dwh"."dim_customer" (customer_code, customer_name) VALUES ('{code}', 'Name {code}')"#
        ))
        .await
        .unwrap();
    }
}
