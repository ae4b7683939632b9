//! End-to-end runs against an in-memory warehouse: a failed fact load is
//! fixed and the run resumed without repeating the units that succeeded.

use dw_core::Project;
use dw_db::{Database, DuckDbBackend};
use dw_ledger::{Ledger, RunStatus, UnitStatus};
use dw_runner::{run_pipeline, ResumeChoice, RunOutcome, RunRequest, UnitEvent};
use std::fs;
use std::path::Path;

fn write_project(dir: &Path) {
    fs::write(
        dir.join("dwflow.yml"),
        r#"
name: retail
source_system: erp
transforms:
  - name: customers
    sql: customers.sql
summaries:
  - name: sum_orders
    sql: sum_orders.sql
"#,
    )
    .unwrap();
    fs::write(
        dir.join("customers.sql"),
        "SELECT * FROM (VALUES ('C1', 'Alice'), ('C2', 'Bob')) AS t(customer_code, customer_name)",
    )
    .unwrap();
    fs::write(
        dir.join("sum_orders.sql"),
        "SELECT COUNT(*) AS matched_orders FROM {{ layers.warehouse }}.fct_orders WHERE customer_sk <> -1",
    )
    .unwrap();
    fs::create_dir_all(dir.join("schema")).unwrap();
    fs::write(
        dir.join("schema/model.yml"),
        r#"
tables:
  - name: dim_customer
    source: trn.customers
    columns:
      - { name: customer_sk, type: BIGINT, role: surrogate_key }
      - { name: customer_code, type: VARCHAR, role: natural_key }
      - { name: customer_name, type: VARCHAR }
  - name: fct_orders
    source: main.orders_feed
    columns:
      - { name: order_id, type: VARCHAR, role: natural_key }
      - { name: customer_sk, type: BIGINT, role: foreign_key, references: dim_customer }
      - { name: amount, type: "DECIMAL(12,2)" }
"#,
    )
    .unwrap();
}

#[derive(Default)]
struct Events {
    started: Vec<String>,
    skipped: Vec<String>,
    failed: Vec<String>,
}

impl Events {
    fn record(&mut self, event: UnitEvent<'_>) {
        match event {
            UnitEvent::Started { name, .. } => self.started.push(name.to_string()),
            UnitEvent::Skipped { name } => self.skipped.push(name.to_string()),
            UnitEvent::Failed { name, .. } => self.failed.push(name.to_string()),
            UnitEvent::Succeeded { .. } => {}
        }
    }
}

async fn scalar(db: &DuckDbBackend, sql: &str) -> Option<i64> {
    db.query_i64(sql).await.unwrap()
}

#[tokio::test]
async fn test_failed_fact_load_resumes_from_failing_unit() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let project = Project::load(dir.path()).unwrap();
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = Ledger::open_memory().unwrap();

    let request = RunRequest {
        rebuild: true,
        ..RunRequest::default()
    };

    let mut events = Events::default();
    let first = run_pipeline(&project, &db, &ledger, &request, &mut |e| events.record(e))
        .await
        .unwrap();
    assert!(!first.resumed);
    match &first.outcome {
        RunOutcome::Fail { unit, trace } => {
            assert_eq!(unit, "load_fct_orders");
            assert!(trace.contains("orders_feed"), "trace: {trace}");
        }
        RunOutcome::Success => panic!("fact load should fail without its source"),
    }
    assert_eq!(events.failed, vec!["load_fct_orders".to_string()]);

    let run = ledger.get_run(first.run_id).unwrap();
    assert_eq!(run.status, RunStatus::FailedWithError);
    let statuses: Vec<(String, UnitStatus)> = ledger
        .units(first.run_id)
        .unwrap()
        .into_iter()
        .map(|u| (u.name.to_string(), u.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("transform_customers".to_string(), UnitStatus::Successful),
            ("rebuild_physical_model".to_string(), UnitStatus::Successful),
            ("load_dim_audit".to_string(), UnitStatus::Successful),
            ("load_dim_customer".to_string(), UnitStatus::Successful),
            ("load_fct_orders".to_string(), UnitStatus::FinishedWithError),
            ("summarise_sum_orders".to_string(), UnitStatus::Pending),
        ]
    );

    // dimension contents: sentinel plus the two customers
    assert_eq!(
        db.query_count("SELECT * FROM dwh.dim_customer").await.unwrap(),
        3
    );

    db.execute(
        "CREATE TABLE main.orders_feed AS SELECT * FROM (VALUES \
         ('O1', 'C1', 10.00), ('O2', 'C9', 5.50), ('O3', 'C2', 1.25)) \
         AS t(order_id, customer_code, amount)",
    )
    .await
    .unwrap();

    let resume = RunRequest {
        choice: ResumeChoice::Resume,
        ..request.clone()
    };
    let mut events = Events::default();
    let second = run_pipeline(&project, &db, &ledger, &resume, &mut |e| events.record(e))
        .await
        .unwrap();
    assert!(second.resumed);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.outcome, RunOutcome::Success);
    assert_eq!(
        events.skipped,
        vec![
            "transform_customers".to_string(),
            "rebuild_physical_model".to_string(),
            "load_dim_audit".to_string(),
            "load_dim_customer".to_string(),
        ]
    );
    assert_eq!(
        events.started,
        vec![
            "load_fct_orders".to_string(),
            "summarise_sum_orders".to_string()
        ]
    );
    assert_eq!(
        ledger.get_run(first.run_id).unwrap().status,
        RunStatus::Successful
    );

    // unmatched customer gets the sentinel key
    assert_eq!(
        scalar(&db, "SELECT customer_sk FROM dwh.fct_orders WHERE order_id = 'O2'").await,
        Some(-1)
    );
    let c1 = scalar(
        &db,
        "SELECT customer_sk FROM dwh.dim_customer WHERE customer_code = 'C1'",
    )
    .await;
    assert_eq!(
        scalar(&db, "SELECT customer_sk FROM dwh.fct_orders WHERE order_id = 'O1'").await,
        c1
    );
    assert!(c1.unwrap() > 0);

    // every fact row points at this run's audit row
    let audit_key = scalar(
        &db,
        &format!(
            "SELECT audit_key FROM dwh.dim_audit WHERE run_id = {}",
            first.run_id
        ),
    )
    .await
    .unwrap();
    assert_eq!(
        db.query_count(&format!(
            "SELECT * FROM dwh.fct_orders WHERE audit_key = {audit_key}"
        ))
        .await
        .unwrap(),
        3
    );

    assert_eq!(
        scalar(&db, "SELECT matched_orders FROM sum.sum_orders").await,
        Some(2)
    );

    // key maps and the staging dataset are gone after success
    assert!(db.list_tables("keymap").await.unwrap().is_empty());
    assert!(db.list_tables("stg").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_second_full_reload_replaces_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let project = Project::load(dir.path()).unwrap();
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = Ledger::open_memory().unwrap();
    db.execute(
        "CREATE TABLE main.orders_feed AS SELECT * FROM (VALUES ('O1', 'C1', 10.00)) \
         AS t(order_id, customer_code, amount)",
    )
    .await
    .unwrap();

    let first = RunRequest {
        rebuild: true,
        ..RunRequest::default()
    };
    let summary = run_pipeline(&project, &db, &ledger, &first, &mut |_| {})
        .await
        .unwrap();
    assert!(summary.outcome.is_success());

    let summary = run_pipeline(&project, &db, &ledger, &RunRequest::default(), &mut |_| {})
        .await
        .unwrap();
    assert!(summary.outcome.is_success());
    assert_eq!(summary.run_id, 2);

    assert_eq!(
        db.query_count("SELECT * FROM dwh.dim_customer").await.unwrap(),
        3
    );
    assert_eq!(
        db.query_count("SELECT * FROM dwh.fct_orders").await.unwrap(),
        1
    );
    // the audit dimension keeps one row per run plus its sentinel
    assert_eq!(
        db.query_count("SELECT * FROM dwh.dim_audit").await.unwrap(),
        3
    );
    assert_eq!(
        scalar(&db, "SELECT audit_key FROM dwh.fct_orders").await,
        scalar(&db, "SELECT audit_key FROM dwh.dim_audit WHERE run_id = 2").await
    );
}
