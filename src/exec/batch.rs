// src/exec/batch.rs

//! Generic dispatch/poll machinery for batch-scheduler backends.
//!
//! [`SchedulerExecutor`] implements the [`BatchExecutor`] capability on top
//! of a [`SchedulerClient`], which wraps the scheduler-specific commands
//! (submit / status / cancel) and the mapping from raw state labels to the
//! coarse [`JobState`] classification. Production clients live in
//! [`super::schedulers`]; tests plug in a fake client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::builder::{BuildResult, Builder};
use crate::config::ExecutorSettings;
use crate::exec::BatchExecutor;
use crate::job::{Job, JobState};

/// One class of batch scheduler, reduced to the operations the executor
/// machinery needs.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    /// Submit the builder's script; returns the scheduler-assigned job id.
    async fn submit(&self, builder: &Builder) -> anyhow::Result<String>;

    /// One status query for the given job id; returns the raw state label.
    async fn status(&self, job_id: &str) -> anyhow::Result<String>;

    /// Cancel an outstanding job.
    async fn cancel(&self, job_id: &str) -> anyhow::Result<()>;

    /// Map a raw state label onto the coarse classification.
    fn classify(&self, label: &str) -> JobState;

    /// `true` for labels meaning "queued, not yet running". Time spent under
    /// such labels counts towards the max-pend-time threshold.
    fn is_pend_label(&self, label: &str) -> bool;
}

/// Batch executor backend, generic over the scheduler client.
pub struct SchedulerExecutor<C> {
    name: String,
    settings: ExecutorSettings,
    max_pend_time: Option<Duration>,
    client: C,
}

impl<C: SchedulerClient> SchedulerExecutor<C> {
    /// `max_pend_time` is the effective threshold: the CLI-level override
    /// when given, otherwise the executor's own setting, otherwise none.
    pub fn new(
        name: impl Into<String>,
        settings: ExecutorSettings,
        max_pend_time: Option<Duration>,
        client: C,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            max_pend_time,
            client,
        }
    }

    /// Cancel a job that exceeded its max pend time and classify the builder
    /// as failed. A cancel-command failure is logged but does not keep the
    /// job alive: the classification stands either way.
    async fn enforce_max_pend_time(&self, builder: &mut Builder) {
        let Some(max) = self.max_pend_time else {
            return;
        };

        let Some(job) = builder.job.as_ref() else {
            return;
        };

        if job.pend_time() <= max {
            return;
        }

        warn!(
            builder = %builder.name,
            executor = %self.name,
            job_id = %job.id(),
            pend_secs = job.pend_time().as_secs(),
            max_secs = max.as_secs(),
            "job exceeded max pend time; cancelling"
        );

        if let Err(err) = self.client.cancel(job.id()).await {
            warn!(
                builder = %builder.name,
                executor = %self.name,
                error = %err,
                "cancel command failed"
            );
        }

        if let Some(job) = builder.job.as_mut() {
            job.mark_cancelled();
        }

        let runtime = builder.timer.stop();
        builder.result = Some(BuildResult {
            exit_code: 1,
            output: String::new(),
            runtime,
        });
    }
}

#[async_trait]
impl<C: SchedulerClient> BatchExecutor for SchedulerExecutor<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    async fn dispatch(&self, mut builder: Builder) -> Option<Builder> {
        builder.timer.start();

        match self.client.submit(&builder).await {
            Ok(job_id) => {
                info!(
                    builder = %builder.name,
                    executor = %self.name,
                    job_id = %job_id,
                    "job submitted"
                );
                builder.job = Some(Job::new(job_id));
                Some(builder)
            }
            Err(err) => {
                warn!(
                    builder = %builder.name,
                    executor = %self.name,
                    error = %err,
                    "job submission failed; no job produced"
                );
                None
            }
        }
    }

    async fn poll(&self, builder: &mut Builder) {
        let Some(job) = builder.job.as_mut() else {
            return;
        };

        // Terminal handles are not re-queried.
        if job.state() != JobState::Incomplete {
            return;
        }

        let label = match self.client.status(job.id()).await {
            Ok(label) => label,
            Err(err) => {
                // One flaky status query must not terminate the run; the
                // builder stays pending until the next cycle.
                warn!(
                    builder = %builder.name,
                    executor = %self.name,
                    job_id = %job.id(),
                    error = %err,
                    "status query failed; treating job as still pending"
                );
                return;
            }
        };

        let state = self.client.classify(&label);
        let delta = job.since_last_observed();
        if state == JobState::Incomplete && self.client.is_pend_label(&label) {
            job.add_pend_time(delta);
        }

        debug!(
            builder = %builder.name,
            executor = %self.name,
            job_id = %job.id(),
            label = %label,
            ?state,
            "poll observation"
        );

        job.update(label, state);

        match state {
            JobState::Incomplete => {
                self.enforce_max_pend_time(builder).await;
            }
            JobState::Complete | JobState::Failed => {
                let runtime = builder.timer.stop();
                builder.result = Some(BuildResult {
                    exit_code: if state == JobState::Complete { 0 } else { 1 },
                    output: String::new(),
                    runtime,
                });
            }
        }
    }
}
