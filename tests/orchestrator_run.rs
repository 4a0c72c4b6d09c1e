// tests/orchestrator_run.rs

//! Submission and collection through the bounded worker pool, using the
//! real local-process executor with scratch scripts.

mod common;
use crate::common::init_tracing;

use std::collections::BTreeSet;
use std::error::Error;
use std::time::Duration;

use jobfan::errors::JobfanError;
use jobfan::orchestrator::{Orchestrator, worker_count};
use jobfan_test_utils::builders::{builder, local_backend, registry_with, script_file};

type TestResult = Result<(), Box<dyn Error>>;

fn local_orchestrator(root: &std::path::Path, procs: Option<usize>) -> Orchestrator {
    let registry = registry_with(vec![local_backend("bash", root)], root);
    Orchestrator::new(registry, Duration::from_millis(10), procs)
}

#[tokio::test]
async fn three_sync_builders_through_width_two_pool() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut orchestrator = local_orchestrator(dir.path(), Some(2));

    let builders = vec![
        builder("a", "bash", script_file(dir.path(), "a.sh", "echo a")),
        builder("b", "bash", script_file(dir.path(), "b.sh", "echo b")),
        builder("c", "bash", script_file(dir.path(), "c.sh", "echo c")),
    ];

    orchestrator.run(builders).await?;

    // All three collected as valid, in some order; none of them pending.
    let names: BTreeSet<&str> = orchestrator
        .get_valid_builders()
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, BTreeSet::from(["a", "b", "c"]));
    assert!(orchestrator.pending_builders().is_empty());

    for b in orchestrator.get_valid_builders() {
        let result = b.result.as_ref().expect("sync builder has a result");
        assert_eq!(result.exit_code, 0);
        assert!(result.success());
    }

    Ok(())
}

#[tokio::test]
async fn sync_failure_is_captured_not_raised() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut orchestrator = local_orchestrator(dir.path(), None);

    let script = script_file(dir.path(), "boom.sh", "echo boom\nexit 3");
    orchestrator.run(vec![builder("boom", "bash", script)]).await?;

    // A failing exit code still yields a valid builder; failure is a
    // property of the result payload.
    let valid = orchestrator.get_valid_builders();
    assert_eq!(valid.len(), 1);

    let result = valid[0].result.as_ref().expect("result recorded");
    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
    assert!(result.output.contains("boom"));

    Ok(())
}

#[tokio::test]
async fn unknown_executor_aborts_the_whole_run() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut orchestrator = local_orchestrator(dir.path(), None);

    let script = script_file(dir.path(), "x.sh", "echo x");
    let err = orchestrator
        .run(vec![builder("x", "ghost", script)])
        .await
        .expect_err("unknown executor must abort");

    assert!(matches!(err, JobfanError::UnknownExecutor(name) if name == "ghost"));
    assert!(orchestrator.get_valid_builders().is_empty());

    Ok(())
}

#[tokio::test]
async fn duplicate_builder_names_are_rejected() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut orchestrator = local_orchestrator(dir.path(), None);

    let s1 = script_file(dir.path(), "one.sh", "echo 1");
    let s2 = script_file(dir.path(), "two.sh", "echo 2");
    let err = orchestrator
        .run(vec![builder("dup", "bash", s1), builder("dup", "bash", s2)])
        .await
        .expect_err("duplicate names must be rejected");

    assert!(matches!(err, JobfanError::ConfigError(_)));

    Ok(())
}

#[tokio::test]
async fn builders_are_recorded_under_their_executor() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut orchestrator = local_orchestrator(dir.path(), None);

    let s1 = script_file(dir.path(), "p.sh", "echo p");
    let s2 = script_file(dir.path(), "q.sh", "echo q");
    orchestrator
        .run(vec![builder("p", "bash", s1), builder("q", "bash", s2)])
        .await?;

    assert_eq!(orchestrator.builders_for("bash"), ["p", "q"]);
    assert!(orchestrator.builders_for("other").is_empty());

    Ok(())
}

#[test]
fn worker_count_is_clamped_and_positive() {
    let host = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);

    assert_eq!(worker_count(None), host);
    assert_eq!(worker_count(Some(1)), 1);
    assert_eq!(worker_count(Some(host + 100)), host);
    assert!(worker_count(Some(0)) >= 1);
}
