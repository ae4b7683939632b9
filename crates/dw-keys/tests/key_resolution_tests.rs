//! Resolution properties over a real DuckDB warehouse.

use dw_core::{Layers, SchemaModel};
use dw_db::{Database, DuckDbBackend};
use dw_ddl::{apply_plan, AuditValues, PhysicalModelBuilder};
use dw_keys::{resolve_foreign_key, FactDataset, KeyMap};

const MODEL: &str = r#"
tables:
  - name: dim_store
    columns:
      - { name: store_sk, type: BIGINT, role: surrogate_key }
      - { name: region, type: VARCHAR, role: natural_key }
      - { name: store_no, type: INTEGER, role: natural_key }
    default_rows:
      - key: -2
        values: { region: "??", store_no: 0 }
  - name: fct_visits
    columns:
      - { name: store_sk, type: BIGINT, role: foreign_key, references: dim_store }
      - { name: visitors, type: INTEGER }
"#;

async fn setup() -> (DuckDbBackend, SchemaModel, Layers) {
    let model = SchemaModel::from_yaml_str(MODEL).unwrap();
    let layers = Layers::default();
    let db = DuckDbBackend::in_memory().unwrap();
    let builder = PhysicalModelBuilder::new(&model, &layers);
    apply_plan(&db, &builder.full_rebuild_plan().unwrap())
        .await
        .unwrap();
    let audit = AuditValues {
        source_system: "pos".to_string(),
        load_timestamp: "2024-03-01 06:00:00".to_string(),
        operation: "INSERT".to_string(),
    };
    let dim = builder.table("dim_store").unwrap();
    for stmt in builder.default_row_statements(dim, &audit) {
        db.execute(&stmt.sql).await.unwrap();
    }
    db.execute(
        r#"INSERT INTO "dwh"."dim_store" (region, store_no)
           VALUES ('north', 1), ('north', 2), ('south', 1), (NULL, 7)"#,
    )
    .await
    .unwrap();
    (db, model, layers)
}

#[tokio::test]
async fn dimension_rows_resolve_to_their_own_keys() {
    let (db, model, layers) = setup().await;
    let dim = model.require("dim_store").unwrap();
    let fact = model.require("fct_visits").unwrap();
    let km = KeyMap::build(&db, &layers, dim).await.unwrap();

    let dataset = FactDataset::stage(
        &db,
        &layers,
        fact,
        r#"SELECT region, store_no, store_sk AS expected FROM "dwh"."dim_store" WHERE store_sk <> -1"#,
    )
    .await
    .unwrap();
    let stats = resolve_foreign_key(&db, &dataset, "store_sk", &km)
        .await
        .unwrap();

    assert_eq!(stats.rows, 5);
    assert_eq!(stats.unmatched, 0);
    let mismatches = db
        .query_count(&format!(
            "SELECT * FROM {} WHERE store_sk <> expected",
            dataset.relation()
        ))
        .await
        .unwrap();
    assert_eq!(mismatches, 0);
}

#[tokio::test]
async fn every_row_gets_a_key() {
    let (db, model, layers) = setup().await;
    let dim = model.require("dim_store").unwrap();
    let fact = model.require("fct_visits").unwrap();
    let km = KeyMap::build(&db, &layers, dim).await.unwrap();

    let dataset = FactDataset::stage(
        &db,
        &layers,
        fact,
        "SELECT * FROM (VALUES ('north', 1, 10), ('north', 1, 12), ('east', 4, 3), (NULL, NULL, 1)) \
         AS t(region, store_no, visitors)",
    )
    .await
    .unwrap();
    let stats = resolve_foreign_key(&db, &dataset, "store_sk", &km)
        .await
        .unwrap();

    assert_eq!(stats.rows, 4);
    assert_eq!(stats.unmatched, 2);
    let nulls = db
        .query_count(&format!(
            "SELECT * FROM {} WHERE store_sk IS NULL",
            dataset.relation()
        ))
        .await
        .unwrap();
    assert_eq!(nulls, 0);
    let first_store = db
        .query_count(&format!(
            "SELECT * FROM {} WHERE store_sk = 1",
            dataset.relation()
        ))
        .await
        .unwrap();
    assert_eq!(first_store, 2);
}
