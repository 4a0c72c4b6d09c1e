//! A fake batch-scheduler client for orchestrator and executor tests.
//!
//! Plugs into the production `SchedulerExecutor` machinery in place of the
//! Slurm/PBS/LSF clients, so tests exercise the real dispatch/poll code
//! paths without an external scheduler.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use anyhow::bail;

use jobfan::builder::Builder;
use jobfan::exec::SchedulerClient;
use jobfan::job::JobState;

#[derive(Default)]
struct FakeState {
    next_id: u64,
    /// Remaining state labels per job id; the last label repeats once the
    /// queue is exhausted.
    timelines: HashMap<String, VecDeque<String>>,
    /// Builder names in submission order.
    submitted: Vec<String>,
    /// Job ids that were cancelled.
    cancelled: Vec<String>,
}

/// A fake scheduler that:
/// - hands out sequential job ids on submit (or fails every submit)
/// - walks each job through a scripted sequence of state labels on status
///   queries, repeating the last label indefinitely
/// - records submissions and cancellations for assertions.
///
/// Labels follow the Slurm convention: `COMPLETED` classifies as complete,
/// `FAILED`/`CANCELLED`/`TIMEOUT` as failed, everything else as incomplete;
/// `PENDING` counts as queued for max-pend-time purposes.
#[derive(Clone)]
pub struct FakeScheduler {
    state: Arc<Mutex<FakeState>>,
    timeline: Vec<String>,
    fail_submit: bool,
}

impl FakeScheduler {
    /// Every job completes on its first status query.
    pub fn new() -> Self {
        Self::with_timeline(&["COMPLETED"])
    }

    /// Every submitted job walks through the given labels, one per status
    /// query, then repeats the last one.
    pub fn with_timeline(labels: &[&str]) -> Self {
        assert!(!labels.is_empty(), "timeline must not be empty");
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            timeline: labels.iter().map(|s| s.to_string()).collect(),
            fail_submit: false,
        }
    }

    /// Make every submission fail (dispatch produces no job).
    pub fn failing_submissions() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            timeline: vec!["COMPLETED".to_string()],
            fail_submit: true,
        }
    }

    /// Builder names submitted so far, in order.
    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Job ids cancelled so far, in order.
    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }
}

impl Default for FakeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchedulerClient for FakeScheduler {
    async fn submit(&self, builder: &Builder) -> anyhow::Result<String> {
        if self.fail_submit {
            bail!("fake scheduler rejected submission of '{}'", builder.name);
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let job_id = state.next_id.to_string();
        state.submitted.push(builder.name.clone());
        state
            .timelines
            .insert(job_id.clone(), self.timeline.iter().cloned().collect());
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> anyhow::Result<String> {
        let mut state = self.state.lock().unwrap();
        let Some(timeline) = state.timelines.get_mut(job_id) else {
            bail!("unknown job id {job_id}");
        };

        // Advance, but keep the final label around so later queries repeat it.
        let label = if timeline.len() > 1 {
            timeline.pop_front().unwrap()
        } else {
            timeline.front().cloned().unwrap()
        };
        Ok(label)
    }

    async fn cancel(&self, job_id: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(job_id.to_string());
        state
            .timelines
            .insert(job_id.to_string(), VecDeque::from(["CANCELLED".to_string()]));
        Ok(())
    }

    fn classify(&self, label: &str) -> JobState {
        match label {
            "COMPLETED" => JobState::Complete,
            "FAILED" | "CANCELLED" | "TIMEOUT" => JobState::Failed,
            _ => JobState::Incomplete,
        }
    }

    fn is_pend_label(&self, label: &str) -> bool {
        label == "PENDING"
    }
}
