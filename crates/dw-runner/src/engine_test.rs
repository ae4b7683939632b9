use super::*;
use crate::error::RunnerError;
use async_trait::async_trait;
use dw_core::{Project, RunMode, Stage, StageSet};
use dw_db::DuckDbBackend;
use dw_ledger::{Ledger, NewUnit, RunStatus, UnitStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct FakeUnit {
    name: UnitName,
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl FakeUnit {
    fn new(name: &str) -> Self {
        Self {
            name: UnitName::new(name),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn work(&self, ctx: &RunContext<'_>) -> RunnerResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RunnerError::InvalidUnit {
                unit: self.name.to_string(),
                message: "boom".to_string(),
            });
        }
        ctx.db
            .execute(&format!("CREATE OR REPLACE TABLE {} AS SELECT 1 AS x", self.name))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl WorkUnit for FakeUnit {
    fn name(&self) -> &UnitName {
        &self.name
    }

    fn stage(&self) -> Stage {
        Stage::Transform
    }

    async fn run(&self, ctx: &RunContext<'_>) -> UnitOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = ctx.step(&self.name, "work", self.work(ctx)).await;
        result.into()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    project: Project,
    db: DuckDbBackend,
    ledger: Ledger,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("dwflow.yml"), "name: engine_test\n").unwrap();
    let project = Project::load(dir.path()).unwrap();
    Fixture {
        _dir: dir,
        project,
        db: DuckDbBackend::in_memory().unwrap(),
        ledger: Ledger::open_memory().unwrap(),
    }
}

fn context<'a>(f: &'a Fixture, run_id: i64) -> RunContext<'a> {
    RunContext {
        run_id,
        mode: RunMode::FullReload,
        project: &f.project,
        db: &f.db,
        ledger: &f.ledger,
        source_system: "test".to_string(),
        load_timestamp: "2024-01-01 00:00:00".to_string(),
    }
}

fn new_run(f: &Fixture, names: &[&str]) -> i64 {
    let units: Vec<NewUnit> = names
        .iter()
        .map(|n| NewUnit {
            name: UnitName::new(*n),
            stage: Stage::Transform,
        })
        .collect();
    f.ledger
        .create_run(RunMode::FullReload, &StageSet::all(), false, &units)
        .unwrap()
        .run_id
}

#[tokio::test]
async fn test_all_units_succeed() {
    let f = fixture();
    let run_id = new_run(&f, &["a", "b"]);
    let units: Vec<Box<dyn WorkUnit>> = vec![Box::new(FakeUnit::new("a")), Box::new(FakeUnit::new("b"))];

    let mut started = Vec::new();
    let outcome = execute(&context(&f, run_id), &units, &mut |event| {
        if let UnitEvent::Started { name, sequence, total } = event {
            started.push((name.to_string(), sequence, total));
        }
    })
    .await
    .unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        started,
        vec![("a".to_string(), 1, 2), ("b".to_string(), 2, 2)]
    );
    assert_eq!(f.ledger.get_run(run_id).unwrap().status, RunStatus::Successful);
    assert!(f
        .ledger
        .units(run_id)
        .unwrap()
        .iter()
        .all(|u| u.status == UnitStatus::Successful));

    let steps = f.ledger.steps(run_id).unwrap();
    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|s| s.step_name == "work"));
}

#[tokio::test]
async fn test_failure_stops_run_and_resume_skips_successful_units() {
    let f = fixture();
    let run_id = new_run(&f, &["a", "b", "c"]);
    let a = FakeUnit::new("a");
    let b = FakeUnit::new("b");
    let c = FakeUnit::new("c");
    let (a_calls, b_calls, c_calls) = (a.calls.clone(), b.calls.clone(), c.calls.clone());
    let b_fail = b.fail.clone();
    b_fail.store(true, Ordering::SeqCst);
    let units: Vec<Box<dyn WorkUnit>> = vec![Box::new(a), Box::new(b), Box::new(c)];

    let outcome = execute(&context(&f, run_id), &units, &mut |_| {})
        .await
        .unwrap();
    match &outcome {
        RunOutcome::Fail { unit, trace } => {
            assert_eq!(unit, "b");
            assert!(trace.contains("boom"));
        }
        RunOutcome::Success => panic!("expected failure"),
    }

    let run = f.ledger.get_run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::FailedWithError);
    assert!(run.message.unwrap().contains("boom"));
    let statuses: Vec<UnitStatus> = f
        .ledger
        .units(run_id)
        .unwrap()
        .iter()
        .map(|u| u.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            UnitStatus::Successful,
            UnitStatus::FinishedWithError,
            UnitStatus::Pending
        ]
    );
    assert_eq!(c_calls.load(Ordering::SeqCst), 0);

    b_fail.store(false, Ordering::SeqCst);
    let mut skipped = Vec::new();
    let outcome = execute(&context(&f, run_id), &units, &mut |event| {
        if let UnitEvent::Skipped { name } = event {
            skipped.push(name.to_string());
        }
    })
    .await
    .unwrap();

    assert!(outcome.is_success());
    assert_eq!(skipped, vec!["a".to_string()]);
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 2);
    assert_eq!(c_calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.ledger.get_run(run_id).unwrap().status, RunStatus::Successful);
}

#[tokio::test]
async fn test_recorded_unit_without_implementation_fails_run() {
    let f = fixture();
    let run_id = new_run(&f, &["a", "ghost"]);
    let units: Vec<Box<dyn WorkUnit>> = vec![Box::new(FakeUnit::new("a"))];

    let outcome = execute(&context(&f, run_id), &units, &mut |_| {})
        .await
        .unwrap();
    assert!(matches!(&outcome, RunOutcome::Fail { unit, .. } if unit == "ghost"));
    assert_eq!(
        f.ledger.get_run(run_id).unwrap().status,
        RunStatus::FailedWithError
    );
}

#[tokio::test]
async fn test_empty_run_succeeds() {
    let f = fixture();
    let run_id = new_run(&f, &[]);
    let outcome = execute(&context(&f, run_id), &[], &mut |_| {})
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Success);
    assert_eq!(f.ledger.get_run(run_id).unwrap().status, RunStatus::Successful);
}
