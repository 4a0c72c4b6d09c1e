// src/registry.rs

//! Executor registry: translates validated configuration into named backend
//! instances and performs one-time environment preparation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ConfigFile, ExecutorKind, ExecutorSettings};
use crate::errors::{JobfanError, Result};
use crate::exec::{
    Backend, LocalExecutor, LsfClient, PbsClient, SchedulerExecutor, SlurmClient,
};

/// Holds one instantiated backend per named executor entry in the config.
///
/// `initialize` builds every backend and runs [`ExecutorRegistry::setup`]
/// once, so holders can assume the per-executor directories and generated
/// `before_script.sh` files exist.
#[derive(Debug)]
pub struct ExecutorRegistry {
    executors: BTreeMap<String, Backend>,
    executor_root: PathBuf,
}

impl ExecutorRegistry {
    /// Instantiate one backend per named entry in the configuration.
    ///
    /// `account` and `max_pend_time` are CLI-level overrides applied to all
    /// batch backends; when absent, each executor's own settings apply.
    pub fn initialize(
        cfg: &ConfigFile,
        account: Option<&str>,
        max_pend_time: Option<u64>,
    ) -> Result<Self> {
        let executor_root = cfg.config.executor_root.clone();
        let mut executors = BTreeMap::new();

        debug!("building executors from configuration");

        for (kind, name, settings) in cfg.executors() {
            let backend = build_backend(kind, name, settings, &executor_root, account, max_pend_time);
            executors.insert(name.to_string(), backend);
        }

        let registry = Self {
            executors,
            executor_root,
        };
        registry.setup()?;

        Ok(registry)
    }

    /// Create `<executor_root>/<name>/` for every executor and write its
    /// generated `before_script.sh`:
    ///
    /// 1. a bash shebang line,
    /// 2. module commands derived from the executor's `module` settings,
    /// 3. the raw `before_script` text, if any.
    ///
    /// Idempotent: directory creation is a no-op when present and the file
    /// write overwrites deterministically.
    pub fn setup(&self) -> Result<()> {
        for (name, backend) in &self.executors {
            let dir = self.executor_root.join(name);
            fs::create_dir_all(&dir)?;

            let settings = backend.settings();

            let mut content = String::from("#!/bin/bash\n");

            let module_cmds = settings
                .module
                .as_ref()
                .map(|m| m.commands())
                .unwrap_or_default();
            if !module_cmds.is_empty() {
                content.push_str(&module_cmds.join("\n"));
                content.push('\n');
            }

            if let Some(before) = &settings.before_script {
                content.push_str(before);
            }

            let file = dir.join("before_script.sh");
            fs::write(&file, content)?;

            info!(executor = %name, path = %file.display(), "wrote before script");
        }

        Ok(())
    }

    /// Build a registry from pre-instantiated backends, skipping setup.
    ///
    /// Used by tests (and embedders) that supply their own backend
    /// implementations instead of going through the configuration.
    pub fn from_backends(
        backends: impl IntoIterator<Item = (String, Backend)>,
        executor_root: PathBuf,
    ) -> Self {
        Self {
            executors: backends.into_iter().collect(),
            executor_root,
        }
    }

    /// The backend for a given executor name.
    ///
    /// An unknown name is a fatal configuration error, surfaced immediately
    /// and never retried.
    pub fn resolve(&self, name: &str) -> Result<&Backend> {
        self.executors
            .get(name)
            .ok_or_else(|| JobfanError::UnknownExecutor(name.to_string()))
    }

    /// The backend for a given executor name, or `None`.
    pub fn get(&self, name: &str) -> Option<&Backend> {
        self.executors.get(name)
    }

    /// All registered executor names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }

    /// Path of the generated before script for an executor.
    pub fn before_script_path(&self, name: &str) -> PathBuf {
        self.executor_root.join(name).join("before_script.sh")
    }
}

fn build_backend(
    kind: ExecutorKind,
    name: &str,
    settings: &ExecutorSettings,
    executor_root: &Path,
    account: Option<&str>,
    max_pend_time: Option<u64>,
) -> Backend {
    // CLI-level max pend time wins over the executor's own setting.
    let effective_pend = max_pend_time
        .or(settings.max_pend_time)
        .map(Duration::from_secs);

    match kind {
        ExecutorKind::Local => {
            let before = executor_root.join(name).join("before_script.sh");
            Backend::Sync(Arc::new(LocalExecutor::new(name, settings.clone(), before)))
        }
        ExecutorKind::Slurm => Backend::Batch(Arc::new(SchedulerExecutor::new(
            name,
            settings.clone(),
            effective_pend,
            SlurmClient::from_settings(settings, account),
        ))),
        ExecutorKind::Pbs => Backend::Batch(Arc::new(SchedulerExecutor::new(
            name,
            settings.clone(),
            effective_pend,
            PbsClient::from_settings(settings, account),
        ))),
        ExecutorKind::Lsf => Backend::Batch(Arc::new(SchedulerExecutor::new(
            name,
            settings.clone(),
            effective_pend,
            LsfClient::from_settings(settings, account),
        ))),
    }
}
