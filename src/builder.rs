// src/builder.rs

//! The unit of work tracked by the orchestrator.
//!
//! A [`Builder`] is created outside the core (by the CLI, or by tests) and
//! handed to the orchestrator. Executor backends mutate it during
//! run/dispatch/poll; the orchestrator only reclassifies it between its
//! tracking sets, never deletes it.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::exec::ExecutorName;
use crate::job::Job;

/// Elapsed-time tracker for a builder.
///
/// `elapsed()` reports the running duration while started, and the frozen
/// duration after `stop()`.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Timer {
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) -> Duration {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
        self.elapsed
    }

    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.elapsed + started.elapsed(),
            None => self.elapsed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

/// Terminal result payload of an executed builder.
///
/// Execution failure (non-zero exit) is captured here, not raised: a builder
/// with a failing exit code is still a "valid" builder at the tracking-set
/// level, and callers read success/failure from this payload.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub exit_code: i32,
    /// Captured stdout + stderr of the script.
    pub output: String,
    pub runtime: Duration,
}

impl BuildResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A script to be executed under a named executor, tracked through its
/// lifecycle.
#[derive(Debug, Clone)]
pub struct Builder {
    /// Unique identity (derived from the script file stem by the CLI).
    pub name: String,
    /// Target executor name; must resolve in the registry.
    pub executor: ExecutorName,
    /// Path of the shell script to execute.
    pub script: PathBuf,
    pub timer: Timer,
    /// Present once the builder reached a terminal state.
    pub result: Option<BuildResult>,
    /// Present iff the builder was dispatched to a batch backend and
    /// dispatch succeeded. At most one handle at a time.
    pub job: Option<Job>,
}

impl Builder {
    pub fn new(
        name: impl Into<String>,
        executor: impl Into<ExecutorName>,
        script: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            executor: executor.into(),
            script: script.into(),
            timer: Timer::default(),
            result: None,
            job: None,
        }
    }

    /// `true` if this builder was dispatched to an asynchronous backend and
    /// owns an outstanding (or finished) job handle.
    pub fn is_batch_job(&self) -> bool {
        self.job.is_some()
    }

    /// `true` once the backend's last poll classified the job as complete.
    pub fn is_complete(&self) -> bool {
        self.job.as_ref().is_some_and(Job::is_complete)
    }

    /// `true` once the backend's last poll classified the job as failed or
    /// cancelled.
    pub fn is_failure(&self) -> bool {
        self.job.as_ref().is_some_and(Job::is_failure)
    }
}

/// Builders display as their unique name in tables and logs.
impl fmt::Display for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
