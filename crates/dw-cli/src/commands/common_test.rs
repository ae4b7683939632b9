use super::*;
use crate::cli::ModeArg;
use dw_core::{RunMode, Stage};
use dw_db::Database;

fn schedule_args(stages: Option<&str>) -> ScheduleArgs {
    ScheduleArgs {
        mode: ModeArg::FullReload,
        stages: stages.map(String::from),
        rebuild: true,
    }
}

fn global(dir: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: dir.display().to_string(),
        target: None,
    }
}

#[test]
fn test_run_request_defaults_to_all_stages() {
    let request = run_request(&schedule_args(None), ResumeChoice::Resume, None).unwrap();
    assert_eq!(request.stages, StageSet::all());
    assert_eq!(request.mode, RunMode::FullReload);
    assert_eq!(request.choice, ResumeChoice::Resume);
    assert!(request.rebuild);
}

#[test]
fn test_run_request_parses_stages() {
    let request = run_request(
        &schedule_args(Some("load, extract")),
        ResumeChoice::Unspecified,
        Some("prod".to_string()),
    )
    .unwrap();
    assert!(request.stages.contains(Stage::Load));
    assert!(!request.stages.contains(Stage::Transform));
    assert_eq!(request.stages.to_string(), "EXTRACT,LOAD");
    assert_eq!(request.target.as_deref(), Some("prod"));

    let unknown = run_request(
        &schedule_args(Some("load,publish")),
        ResumeChoice::Unspecified,
        None,
    );
    assert!(unknown.is_err());
}

#[test]
fn test_format_time() {
    assert_eq!(format_time(None), "-");
    let t = chrono::DateTime::parse_from_rfc3339("2024-03-01T12:30:05Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert_eq!(format_time(Some(t)), "2024-03-01 12:30:05");
}

#[tokio::test]
async fn test_open_warehouse_relative_to_project() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("dwflow.yml"),
        "name: retail\ndatabase:\n  path: data/warehouse.duckdb\n",
    )
    .unwrap();
    let project = load_project(&global(dir.path())).unwrap();

    let db = open_warehouse(&project, None).unwrap();
    db.execute("CREATE TABLE t AS SELECT 1 AS x").await.unwrap();
    assert!(dir.path().join("data/warehouse.duckdb").exists());

    let ledger = open_ledger(&project).unwrap();
    assert!(ledger.last_run().unwrap().is_none());
    assert!(dir.path().join("target/ledger.duckdb").exists());
}

#[test]
fn test_missing_project_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_project(&global(&dir.path().join("nope"))).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load project"));
}
