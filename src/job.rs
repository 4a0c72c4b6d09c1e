// src/job.rs

//! Job handle for builders dispatched to asynchronous batch backends.
//!
//! A [`Job`] is created by a backend at successful dispatch and mutated only
//! by that backend's `poll`. The orchestrator never constructs one; it only
//! reads the coarse [`JobState`] classification.

use std::time::{Duration, Instant};

/// Coarse classification of a scheduler-reported job state.
///
/// Backends map their raw state labels (an open set the orchestrator never
/// interprets) onto this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// The job is still outstanding (queued, running, completing, ...).
    Incomplete,
    /// The job finished and produced a result.
    Complete,
    /// The job failed, was cancelled, or exceeded its max pend time.
    Failed,
}

/// External reference to a batch-scheduler job: the scheduler-assigned id,
/// the raw state label last observed, and its classification.
#[derive(Debug, Clone)]
pub struct Job {
    id: String,
    label: String,
    state: JobState,
    /// Accumulated time the job has spent in a queued (non-running) state,
    /// used for max-pend-time enforcement.
    pend_time: Duration,
    /// Moment of the previous observation (dispatch time for a fresh job).
    last_observed: Instant,
}

impl Job {
    /// Create a handle for a freshly submitted job.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: "SUBMITTED".to_string(),
            state: JobState::Incomplete,
            pend_time: Duration::ZERO,
            last_observed: Instant::now(),
        }
    }

    /// Scheduler-assigned job id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw scheduler state label last observed (e.g. `PENDING`, `RUN`).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == JobState::Complete
    }

    pub fn is_failure(&self) -> bool {
        self.state == JobState::Failed
    }

    /// Record a fresh observation from the scheduler.
    pub fn update(&mut self, label: impl Into<String>, state: JobState) {
        self.label = label.into();
        self.state = state;
    }

    /// Mark the job as cancelled (used for max-pend-time enforcement).
    pub fn mark_cancelled(&mut self) {
        self.label = "CANCELLED".to_string();
        self.state = JobState::Failed;
    }

    /// Accumulated time spent in a queued state.
    pub fn pend_time(&self) -> Duration {
        self.pend_time
    }

    /// Add time observed in a queued state since the previous poll.
    pub fn add_pend_time(&mut self, delta: Duration) {
        self.pend_time += delta;
    }

    /// Time since the previous observation, resetting the observation clock.
    ///
    /// Backends call this once per poll; the first call reports the time
    /// since dispatch.
    pub fn since_last_observed(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_observed;
        self.last_observed = now;
        delta
    }
}
