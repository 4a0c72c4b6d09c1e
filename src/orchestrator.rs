// src/orchestrator.rs

//! The orchestration core.
//!
//! [`Orchestrator::run`] fans a bounded worker pool out over a batch of
//! builders, running synchronous backends to completion and dispatching
//! asynchronous ones, then collects the outcomes. [`Orchestrator::poll`]
//! converges the resulting pending set down to completed and cancelled.
//!
//! All tracking sets (full list, valid, pending, completed, cancelled,
//! submission-failed) are mutated only on the orchestrator's own task.
//! Worker tasks own their builder for the duration of the run/dispatch and
//! hand it back by value, so no locking is needed around the sets.

use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::builder::Builder;
use crate::errors::{JobfanError, Result};
use crate::exec::Backend;
use crate::registry::ExecutorRegistry;
use crate::report;

/// Width of the submission worker pool: the configured count, clamped to
/// the host's available execution units, and always at least 1.
pub fn worker_count(configured: Option<usize>) -> usize {
    let host = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    configured.unwrap_or(host).min(host).max(1)
}

/// Drives a batch of builders from submission through terminal state.
pub struct Orchestrator {
    registry: ExecutorRegistry,
    poll_interval: Duration,
    num_procs: Option<usize>,

    /// Owner of every builder accepted by `run`, keyed by unique name.
    /// Builders are never deleted, only reclassified between the name sets
    /// below.
    store: HashMap<String, Builder>,

    /// Every accepted builder, in submission order.
    builders: Vec<String>,
    /// Builder names grouped by executor, for backend-level introspection.
    by_executor: HashMap<String, Vec<String>>,

    /// Builders that produced a result or an outstanding job, in collection
    /// order. Cancelled builders are removed from this list.
    valid_builders: Vec<String>,
    /// Batch builders whose terminal state is not yet known.
    pending: Vec<String>,
    completed: BTreeSet<String>,
    cancelled: BTreeSet<String>,
    /// Builders whose dispatch produced no job. Excluded from every other
    /// tracking set, reported separately at the end of the run.
    submission_failed: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        registry: ExecutorRegistry,
        poll_interval: Duration,
        num_procs: Option<usize>,
    ) -> Self {
        Self {
            registry,
            poll_interval,
            num_procs,
            store: HashMap::new(),
            builders: Vec::new(),
            by_executor: HashMap::new(),
            valid_builders: Vec::new(),
            pending: Vec::new(),
            completed: BTreeSet::new(),
            cancelled: BTreeSet::new(),
            submission_failed: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// All registered executor names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// The backend for a given executor name, or `None`.
    pub fn get(&self, name: &str) -> Option<&Backend> {
        self.registry.get(name)
    }

    /// Submit every builder to its resolved backend through a bounded worker
    /// pool and gather the outcomes.
    ///
    /// Synchronous backends run to completion inside their worker; batch
    /// backends only block for submission latency. Collection multiplexes
    /// over all in-flight units, so one slow backend never serializes the
    /// rest. After collection, batch builders with an attached job are
    /// isolated into the pending set for [`Orchestrator::poll`].
    pub async fn run(&mut self, builders: Vec<Builder>) -> Result<()> {
        // Resolve everything up front: an unknown executor aborts the whole
        // run before any work is submitted.
        for builder in &builders {
            self.registry.resolve(&builder.executor)?;

            if self.store.contains_key(&builder.name) || self.builders.contains(&builder.name) {
                return Err(JobfanError::ConfigError(format!(
                    "duplicate builder name '{}'",
                    builder.name
                )));
            }

            self.builders.push(builder.name.clone());
            self.by_executor
                .entry(builder.executor.clone())
                .or_default()
                .push(builder.name.clone());
        }

        let width = worker_count(self.num_procs);
        info!(workers = width, builders = builders.len(), "spawning workers for submission");

        let semaphore = Arc::new(Semaphore::new(width));
        let mut pool: JoinSet<(String, Option<Builder>)> = JoinSet::new();

        for builder in builders {
            // Validated above; clone the backend handle into the worker.
            let backend = self.registry.resolve(&builder.executor)?.clone();
            let semaphore = Arc::clone(&semaphore);

            pool.spawn(async move {
                // The semaphore is never closed while the pool is alive.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker semaphore closed");

                let name = builder.name.clone();
                match backend {
                    Backend::Sync(exec) => {
                        let builder = exec.run(builder).await;
                        (name, Some(builder))
                    }
                    Backend::Batch(exec) => {
                        let builder = exec.dispatch(builder).await;
                        (name, builder)
                    }
                }
            });
        }

        // Multiplexed wait: whichever unit finishes next is collected next,
        // and draining the pool fully is the clean shutdown.
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok((name, Some(builder))) => {
                    debug!(builder = %name, "collected builder");
                    self.store.insert(name.clone(), builder);
                    self.valid_builders.push(name);
                }
                Ok((name, None)) => {
                    warn!(
                        builder = %name,
                        "backend produced no job; builder excluded from tracking"
                    );
                    self.submission_failed.push(name);
                }
                Err(err) => {
                    warn!(error = %err, "worker task failed to complete");
                }
            }
        }

        // Isolate batch builders for the polling loop; synchronous builders
        // are already terminal.
        for name in &self.valid_builders {
            if self.store.get(name).is_some_and(Builder::is_batch_job) {
                self.pending.push(name.clone());
            }
        }

        info!(
            valid = self.valid_builders.len(),
            pending = self.pending.len(),
            submission_failed = self.submission_failed.len(),
            "submission complete"
        );

        Ok(())
    }

    /// Poll all outstanding batch builders until none remain pending.
    ///
    /// Each cycle sleeps for the poll interval, refreshes every pending
    /// builder's job state, applies the classifications, and prints a
    /// pending-jobs snapshot. On exit, cancelled builders and submission
    /// failures are reported.
    pub async fn poll(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            info!(
                pending = self.pending.len(),
                interval_secs = self.poll_interval.as_secs(),
                "polling jobs after interval"
            );
            tokio::time::sleep(self.poll_interval).await;

            self.poll_cycle().await?;

            report::print_pending_jobs(self.pending_builders());
        }

        if !self.cancelled.is_empty() {
            report::print_cancelled_jobs(self.cancelled());
        }
        if !self.submission_failed.is_empty() {
            report::print_submission_failures(&self.submission_failed);
        }

        Ok(())
    }

    /// One poll iteration: refresh every pending builder's state, then move
    /// finished builders out of the pending set.
    ///
    /// Classification runs on a stable snapshot of the pending set taken at
    /// entry; removals are applied only after the full scan. A builder
    /// observed as both complete and failed in the same cycle counts as
    /// complete.
    pub async fn poll_cycle(&mut self) -> Result<()> {
        let snapshot: Vec<String> = self.pending.clone();

        let mut completed_now: Vec<String> = Vec::new();
        let mut cancelled_now: Vec<String> = Vec::new();

        for name in &snapshot {
            let Some(executor) = self.store.get(name).map(|b| b.executor.clone()) else {
                continue;
            };

            let backend = match self.registry.resolve(&executor)? {
                Backend::Batch(exec) => Arc::clone(exec),
                // Synchronous builders never enter the pending set.
                Backend::Sync(_) => continue,
            };

            let Some(builder) = self.store.get_mut(name) else {
                continue;
            };

            backend.poll(builder).await;

            // Complete wins over failure when a backend reports both.
            if builder.is_complete() {
                completed_now.push(name.clone());
            } else if builder.is_failure() {
                cancelled_now.push(name.clone());
            }
        }

        for name in completed_now {
            self.pending.retain(|n| n != &name);
            self.completed.insert(name);
        }

        for name in cancelled_now {
            self.pending.retain(|n| n != &name);
            // A cancelled job is no longer a usable result.
            self.valid_builders.retain(|n| n != &name);
            self.cancelled.insert(name);
        }

        Ok(())
    }

    /// Builders that produced a result or an outstanding job, in collection
    /// order.
    pub fn get_valid_builders(&self) -> Vec<&Builder> {
        self.valid_builders
            .iter()
            .filter_map(|name| self.store.get(name))
            .collect()
    }

    /// Builders still awaiting a terminal state.
    pub fn pending_builders(&self) -> Vec<&Builder> {
        self.pending
            .iter()
            .filter_map(|name| self.store.get(name))
            .collect()
    }

    pub fn completed(&self) -> Vec<&Builder> {
        self.completed
            .iter()
            .filter_map(|name| self.store.get(name))
            .collect()
    }

    pub fn cancelled(&self) -> Vec<&Builder> {
        self.cancelled
            .iter()
            .filter_map(|name| self.store.get(name))
            .collect()
    }

    /// Names of builders whose dispatch produced no job.
    pub fn submission_failed(&self) -> &[String] {
        &self.submission_failed
    }

    /// Look up an accepted builder by name.
    pub fn builder(&self, name: &str) -> Option<&Builder> {
        self.store.get(name)
    }

    /// Every builder accepted by `run`, in submission order.
    pub fn builder_names(&self) -> &[String] {
        &self.builders
    }

    /// Names of builders recorded under the given executor.
    pub fn builders_for(&self, executor: &str) -> &[String] {
        self.by_executor
            .get(executor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
