// src/exec/mod.rs

//! Executor backends.
//!
//! The orchestrator talks to backends through the capability traits in this
//! module instead of concrete executor types. This makes it easy to plug a
//! fake scheduler client into tests while keeping the production executors
//! in [`local`] and [`batch`].
//!
//! Two capability shapes exist, and the orchestrator branches only on the
//! shape, never on the concrete backend:
//!
//! - [`SyncExecutor`]: runs a builder to completion in the calling worker
//!   task (the local-process backend).
//! - [`BatchExecutor`]: submits a builder to an external scheduler and
//!   returns immediately; completion is discovered later through `poll`.
//!
//! - [`local`] contains the local-process executor.
//! - [`batch`] contains the generic dispatch/poll machinery for batch
//!   schedulers, parameterized over a [`SchedulerClient`].
//! - [`schedulers`] contains the Slurm / PBS / LSF scheduler clients.

pub mod batch;
pub mod local;
pub mod schedulers;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::builder::Builder;
use crate::config::ExecutorSettings;

pub use batch::{SchedulerClient, SchedulerExecutor};
pub use local::LocalExecutor;
pub use schedulers::{LsfClient, PbsClient, SlurmClient};

/// Canonical executor name type used throughout the crate.
pub type ExecutorName = String;

/// Synchronous capability: run-to-completion in the calling worker.
#[async_trait]
pub trait SyncExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn settings(&self) -> &ExecutorSettings;

    /// Execute the builder's script to completion.
    ///
    /// Execution failure (non-zero exit, spawn error) is captured into the
    /// builder's result payload, never raised: the orchestrator must always
    /// receive the builder back.
    async fn run(&self, builder: Builder) -> Builder;
}

/// Asynchronous capability: fire-and-forget dispatch plus status polling.
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn settings(&self) -> &ExecutorSettings;

    /// Submit the builder's script to the external scheduler.
    ///
    /// On success the returned builder carries a job handle. On submission
    /// failure this returns `None` (no job was produced) so the orchestrator
    /// can distinguish "no job" from "job outstanding".
    async fn dispatch(&self, builder: Builder) -> Option<Builder>;

    /// Refresh the builder's job state with a single status query.
    ///
    /// Must never sleep internally. A failed status query degrades to
    /// "still pending" so one flaky query cannot terminate a run. Also
    /// enforces the max-pend-time policy when configured.
    async fn poll(&self, builder: &mut Builder);
}

/// A registered backend, tagged by capability.
#[derive(Clone)]
pub enum Backend {
    Sync(Arc<dyn SyncExecutor>),
    Batch(Arc<dyn BatchExecutor>),
}

impl Backend {
    pub fn name(&self) -> &str {
        match self {
            Backend::Sync(e) => e.name(),
            Backend::Batch(e) => e.name(),
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        match self {
            Backend::Sync(e) => e.settings(),
            Backend::Batch(e) => e.settings(),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Backend::Batch(_))
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Backend::Sync(_) => "Sync",
            Backend::Batch(_) => "Batch",
        };
        f.debug_struct("Backend")
            .field("name", &self.name())
            .field("shape", &shape)
            .finish()
    }
}
