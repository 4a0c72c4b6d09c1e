// tests/polling.rs

//! Polling convergence: pending -> completed / cancelled classification,
//! dispatch failures, and max-pend-time enforcement, driven through the
//! production batch machinery with a fake scheduler client.

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use tokio::time::timeout;

use jobfan::orchestrator::Orchestrator;
use jobfan_test_utils::builders::{builder, fake_batch_backend, registry_with};
use jobfan_test_utils::fake_scheduler::FakeScheduler;

type TestResult = Result<(), Box<dyn Error>>;

fn batch_orchestrator(
    root: &Path,
    backends: Vec<jobfan::exec::Backend>,
    poll_interval: Duration,
) -> Orchestrator {
    Orchestrator::new(registry_with(backends, root), poll_interval, None)
}

#[tokio::test]
async fn dispatch_then_first_poll_classifies_completed() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    // Scheduler reports the job finished on the very first status query.
    let scheduler = FakeScheduler::new();
    let mut orchestrator = batch_orchestrator(
        dir.path(),
        vec![fake_batch_backend("batch", None, scheduler.clone())],
        Duration::from_millis(5),
    );

    orchestrator
        .run(vec![builder("fast", "batch", "fast.sh")])
        .await?;

    assert_eq!(orchestrator.pending_builders().len(), 1);
    assert_eq!(scheduler.submitted(), ["fast"]);

    // A single cycle, no second sleep needed.
    orchestrator.poll_cycle().await?;

    assert!(orchestrator.pending_builders().is_empty());
    assert_eq!(orchestrator.completed().len(), 1);
    assert!(orchestrator.cancelled().is_empty());

    let done = orchestrator.builder("fast").expect("retained");
    assert!(done.is_complete());
    assert_eq!(done.result.as_ref().map(|r| r.exit_code), Some(0));

    Ok(())
}

#[tokio::test]
async fn staggered_completion_shrinks_pending_monotonically() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let fast = FakeScheduler::new();
    let slow = FakeScheduler::with_timeline(&["RUNNING", "COMPLETED"]);
    let mut orchestrator = batch_orchestrator(
        dir.path(),
        vec![
            fake_batch_backend("fastq", None, fast),
            fake_batch_backend("slowq", None, slow),
        ],
        Duration::from_millis(5),
    );

    orchestrator
        .run(vec![
            builder("one", "fastq", "one.sh"),
            builder("two", "slowq", "two.sh"),
        ])
        .await?;
    assert_eq!(orchestrator.pending_builders().len(), 2);

    // Iteration 1: "one" completes, "two" is still running.
    orchestrator.poll_cycle().await?;
    assert_eq!(orchestrator.completed().len(), 1);
    assert_eq!(orchestrator.pending_builders().len(), 1);

    // Iteration 2: "two" completes; pending is empty only now.
    orchestrator.poll_cycle().await?;
    assert_eq!(orchestrator.completed().len(), 2);
    assert!(orchestrator.pending_builders().is_empty());

    Ok(())
}

#[tokio::test]
async fn failed_job_is_cancelled_and_leaves_valid_builders() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let scheduler = FakeScheduler::with_timeline(&["RUNNING", "FAILED"]);
    let mut orchestrator = batch_orchestrator(
        dir.path(),
        vec![fake_batch_backend("batch", None, scheduler)],
        Duration::from_millis(5),
    );

    orchestrator
        .run(vec![builder("doomed", "batch", "doomed.sh")])
        .await?;
    assert_eq!(orchestrator.get_valid_builders().len(), 1);

    orchestrator.poll_cycle().await?;
    assert_eq!(orchestrator.pending_builders().len(), 1);

    orchestrator.poll_cycle().await?;
    assert!(orchestrator.pending_builders().is_empty());
    assert_eq!(orchestrator.cancelled().len(), 1);
    assert!(orchestrator.completed().is_empty());
    // A cancelled job is no longer a usable result.
    assert!(orchestrator.get_valid_builders().is_empty());

    Ok(())
}

#[tokio::test]
async fn dispatch_failure_appears_in_no_tracking_set() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut orchestrator = batch_orchestrator(
        dir.path(),
        vec![fake_batch_backend(
            "batch",
            None,
            FakeScheduler::failing_submissions(),
        )],
        Duration::from_millis(5),
    );

    orchestrator
        .run(vec![builder("ghostjob", "batch", "ghostjob.sh")])
        .await?;

    assert!(orchestrator.get_valid_builders().is_empty());
    assert!(orchestrator.pending_builders().is_empty());
    assert!(orchestrator.completed().is_empty());
    assert!(orchestrator.cancelled().is_empty());
    // ...but it is recorded as a submission failure rather than vanishing.
    assert_eq!(orchestrator.submission_failed(), ["ghostjob"]);

    // The convergence loop terminates immediately with nothing pending.
    timeout(Duration::from_secs(1), orchestrator.poll()).await??;
    assert!(orchestrator.cancelled().is_empty());

    Ok(())
}

#[tokio::test]
async fn exceeding_max_pend_time_cancels_the_job() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let scheduler = FakeScheduler::with_timeline(&["PENDING"]);
    let mut orchestrator = batch_orchestrator(
        dir.path(),
        vec![fake_batch_backend(
            "batch",
            Some(Duration::from_nanos(1)),
            scheduler.clone(),
        )],
        Duration::from_millis(5),
    );

    orchestrator
        .run(vec![builder("stuck", "batch", "stuck.sh")])
        .await?;
    assert_eq!(orchestrator.pending_builders().len(), 1);

    // The first observation already exceeds the threshold.
    orchestrator.poll_cycle().await?;

    assert!(orchestrator.pending_builders().is_empty());
    assert_eq!(orchestrator.cancelled().len(), 1);
    assert!(orchestrator.get_valid_builders().is_empty());
    assert_eq!(scheduler.cancelled().len(), 1);

    let stuck = orchestrator.builder("stuck").expect("retained");
    assert!(stuck.is_failure());
    assert_eq!(stuck.job.as_ref().map(|j| j.label()), Some("CANCELLED"));

    Ok(())
}

#[tokio::test]
async fn poll_loop_converges_end_to_end() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let scheduler = FakeScheduler::with_timeline(&["PENDING", "RUNNING", "COMPLETED"]);
    let mut orchestrator = batch_orchestrator(
        dir.path(),
        vec![fake_batch_backend("batch", None, scheduler)],
        Duration::from_millis(5),
    );

    orchestrator
        .run(vec![builder("steady", "batch", "steady.sh")])
        .await?;

    // Full loop with sleeping between cycles; bounded by a test timeout.
    timeout(Duration::from_secs(3), orchestrator.poll()).await??;

    assert!(orchestrator.pending_builders().is_empty());
    assert_eq!(orchestrator.completed().len(), 1);
    assert_eq!(orchestrator.get_valid_builders().len(), 1);

    Ok(())
}
