// src/exec/local.rs

//! Local-process executor.
//!
//! Runs builder scripts to completion via the platform shell using
//! `tokio::process::Command`. The generated `before_script.sh` (written by
//! the registry at setup time) is sourced ahead of the script when present,
//! so local jobs see the same environment preparation as batch jobs.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::builder::{BuildResult, Builder};
use crate::config::ExecutorSettings;
use crate::exec::SyncExecutor;

pub struct LocalExecutor {
    name: String,
    settings: ExecutorSettings,
    /// Path of the generated `before_script.sh` for this executor.
    before_script: PathBuf,
}

impl LocalExecutor {
    pub fn new(
        name: impl Into<String>,
        settings: ExecutorSettings,
        before_script: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            before_script,
        }
    }

    /// Shell command line for the builder, sourcing the before script when
    /// it exists on disk.
    fn shell_command(&self, builder: &Builder) -> String {
        let script = builder.script.display();
        if self.before_script.is_file() {
            format!(". '{}' && sh '{script}'", self.before_script.display())
        } else {
            format!("sh '{script}'")
        }
    }
}

#[async_trait]
impl SyncExecutor for LocalExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    async fn run(&self, mut builder: Builder) -> Builder {
        builder.timer.start();

        let shell_cmd = self.shell_command(&builder);

        info!(
            builder = %builder,
            executor = %self.name,
            cmd = %shell_cmd,
            "running script"
        );

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&shell_cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&shell_cmd);
            c
        };

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let (exit_code, output) = match cmd.output().await {
            Ok(out) => {
                let code = out.status.code().unwrap_or(-1);
                let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&out.stderr));
                (code, text)
            }
            Err(err) => {
                // Spawn failure is an execution failure, not a crash: the
                // orchestrator still gets the builder back.
                warn!(
                    builder = %builder,
                    executor = %self.name,
                    error = %err,
                    "failed to spawn script process"
                );
                (-1, err.to_string())
            }
        };

        let runtime = builder.timer.stop();

        info!(
            builder = %builder,
            executor = %self.name,
            exit_code,
            runtime_ms = runtime.as_millis() as u64,
            "script finished"
        );

        builder.result = Some(BuildResult {
            exit_code,
            output,
            runtime,
        });

        builder
    }
}
