#![allow(dead_code)]

//! Constructors for registries, backends and builders used across the
//! integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jobfan::builder::Builder;
use jobfan::config::ExecutorSettings;
use jobfan::exec::{Backend, LocalExecutor, SchedulerExecutor};
use jobfan::registry::ExecutorRegistry;

use crate::fake_scheduler::FakeScheduler;

/// A `Backend::Batch` wrapping the production batch machinery around a fake
/// scheduler client.
pub fn fake_batch_backend(
    name: &str,
    max_pend_time: Option<Duration>,
    client: FakeScheduler,
) -> Backend {
    Backend::Batch(Arc::new(SchedulerExecutor::new(
        name,
        ExecutorSettings::default(),
        max_pend_time,
        client,
    )))
}

/// A real local-process backend rooted in the given directory.
pub fn local_backend(name: &str, root: &Path) -> Backend {
    let before = root.join(name).join("before_script.sh");
    Backend::Sync(Arc::new(LocalExecutor::new(
        name,
        ExecutorSettings::default(),
        before,
    )))
}

/// A registry holding the given backends, keyed by their names.
pub fn registry_with(backends: Vec<Backend>, root: &Path) -> ExecutorRegistry {
    ExecutorRegistry::from_backends(
        backends
            .into_iter()
            .map(|b| (b.name().to_string(), b)),
        root.to_path_buf(),
    )
}

/// A builder targeting the given executor.
pub fn builder(name: &str, executor: &str, script: impl Into<PathBuf>) -> Builder {
    Builder::new(name, executor, script)
}

/// Write an executable shell script into `dir` and return its path.
pub fn script_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{content}\n")).expect("write script");
    path
}
