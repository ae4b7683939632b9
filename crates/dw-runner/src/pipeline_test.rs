use super::*;
use dw_core::StageSet;
use dw_db::DuckDbBackend;
use std::fs;
use std::path::Path;

fn write_project(dir: &Path) {
    fs::write(
        dir.join("dwflow.yml"),
        r#"
name: retail
source_system: erp
vars:
  min_amount: 0
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
        "SELECT COUNT(*) AS order_count FROM {{ layers.warehouse }}.fct_orders WHERE amount > {{ var('min_amount') }}",
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

fn project() -> (tempfile::TempDir, Project) {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let project = Project::load(dir.path()).unwrap();
    (dir, project)
}

#[test]
fn test_incremental_load_rejected() {
    assert!(matches!(
        check_mode(RunMode::Incremental, &StageSet::all()),
        Err(RunnerError::IncrementalLoad)
    ));
    check_mode(
        RunMode::Incremental,
        &StageSet::parse("extract,transform").unwrap(),
    )
    .unwrap();
    check_mode(RunMode::FullReload, &StageSet::all()).unwrap();
}

#[tokio::test]
async fn test_plan_renders_sql_steps() {
    let (_dir, project) = project();
    let db = DuckDbBackend::in_memory().unwrap();
    let request = RunRequest {
        rebuild: true,
        ..RunRequest::default()
    };

    let plan = plan_pipeline(&project, &db, &request).await.unwrap();
    assert_eq!(
        plan.schedule.names(),
        vec![
            "transform_customers",
            "rebuild_physical_model",
            "load_dim_audit",
            "load_dim_customer",
            "load_fct_orders",
            "summarise_sum_orders"
        ]
    );
    assert_eq!(plan.sql.len(), 2);
    assert_eq!(plan.sql[1].name, "sum_orders");
    assert!(plan.sql[1].sql.contains("FROM dwh.fct_orders WHERE amount > 0"));
    assert_eq!(plan.sql[1].checksum.len(), 64);
}

#[tokio::test]
async fn test_load_without_physical_model_rejected() {
    let (_dir, project) = project();
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = Ledger::open_memory().unwrap();

    let err = run_pipeline(&project, &db, &ledger, &RunRequest::default(), &mut |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::MissingPhysicalModel { .. }));
    // nothing was recorded
    assert!(ledger.last_run().unwrap().is_none());
}

#[tokio::test]
async fn test_stage_subset_without_load_needs_no_model() {
    let (_dir, project) = project();
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = Ledger::open_memory().unwrap();
    let request = RunRequest {
        stages: StageSet::parse("transform").unwrap(),
        ..RunRequest::default()
    };

    let summary = run_pipeline(&project, &db, &ledger, &request, &mut |_| {})
        .await
        .unwrap();
    assert_eq!(summary.outcome, RunOutcome::Success);
    assert!(!summary.resumed);
    assert_eq!(
        db.query_count("SELECT * FROM trn.customers").await.unwrap(),
        2
    );

    let stats = ledger.dataset_stats(summary.run_id).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].dataset, "trn.customers");
    assert_eq!(stats[0].row_count, 2);
    assert_eq!(stats[0].column_count, 2);

    let steps = ledger.steps(summary.run_id).unwrap();
    let checksum = steps
        .iter()
        .find(|s| s.step_name == "sql_checksum")
        .unwrap();
    assert_eq!(checksum.message.as_deref().map(str::len), Some(64));
}

#[tokio::test]
async fn test_failed_run_blocks_until_choice_made() {
    let (_dir, project) = project();
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = Ledger::open_memory().unwrap();
    let request = RunRequest {
        rebuild: true,
        ..RunRequest::default()
    };

    // main.orders_feed does not exist, so the fact load fails
    let first = run_pipeline(&project, &db, &ledger, &request, &mut |_| {})
        .await
        .unwrap();
    assert!(matches!(&first.outcome, RunOutcome::Fail { unit, .. } if unit == "load_fct_orders"));

    let err = run_pipeline(&project, &db, &ledger, &request, &mut |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::ResumeRequired { run_id, .. } if run_id == first.run_id));

    let discard = RunRequest {
        choice: ResumeChoice::NewRun,
        ..request.clone()
    };
    let err = run_pipeline(&project, &db, &ledger, &discard, &mut |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::DiscardWithRebuild { .. }));

    let discard = RunRequest {
        choice: ResumeChoice::NewRun,
        rebuild: false,
        stages: StageSet::parse("transform").unwrap(),
        ..RunRequest::default()
    };
    let second = run_pipeline(&project, &db, &ledger, &discard, &mut |_| {})
        .await
        .unwrap();
    assert_eq!(second.run_id, first.run_id + 1);
    assert!(second.outcome.is_success());
}

#[tokio::test]
async fn test_run_without_unit_records_is_not_resumed() {
    let (_dir, project) = project();
    let db = DuckDbBackend::in_memory().unwrap();
    let ledger = Ledger::open_memory().unwrap();
    let stages = StageSet::parse("transform").unwrap();
    let orphan = ledger
        .create_run(RunMode::FullReload, &stages, false, &[])
        .unwrap();

    let request = RunRequest {
        stages,
        choice: ResumeChoice::Resume,
        ..RunRequest::default()
    };
    let mut events = 0;
    let err = run_pipeline(&project, &db, &ledger, &request, &mut |_| events += 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::ScheduleChanged { run_id, .. } if run_id == orphan.run_id));
    assert_eq!(events, 0);
    assert_eq!(
        ledger.get_run(orphan.run_id).unwrap().status,
        dw_ledger::RunStatus::Pending
    );
    assert!(!db.relation_exists("trn", "customers").await.unwrap());
}
