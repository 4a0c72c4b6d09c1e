// src/exec/schedulers.rs

//! Scheduler clients for Slurm, PBS and LSF.
//!
//! Each client shells out to the scheduler's native commands and keeps
//! output handling to the minimum needed to extract a job id or a single
//! state label. Scheduler-format knowledge stays in this module; the
//! orchestrator and the generic batch machinery never see raw output.

use async_trait::async_trait;
use anyhow::{Context, bail};
use tokio::process::Command;
use tracing::debug;

use crate::builder::Builder;
use crate::config::ExecutorSettings;
use crate::exec::SchedulerClient;
use crate::job::JobState;

/// Run a scheduler command and return its trimmed stdout.
///
/// Non-zero exit is an error carrying the command's stderr, so submission
/// failures surface with the scheduler's own message.
async fn run_command(program: &str, args: &[String]) -> anyhow::Result<String> {
    debug!(%program, ?args, "running scheduler command");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("spawning '{program}'"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "'{program}' exited with {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// First whitespace-separated token of a command's output, or an error if
/// the output was empty.
fn first_token(output: &str, what: &str) -> anyhow::Result<String> {
    output
        .split_whitespace()
        .next()
        .map(str::to_string)
        .with_context(|| format!("empty output while reading {what}"))
}

/// Slurm client: `sbatch` / `sacct` / `scancel`.
pub struct SlurmClient {
    queue: Option<String>,
    account: Option<String>,
    options: Vec<String>,
}

impl SlurmClient {
    pub fn from_settings(settings: &ExecutorSettings, account: Option<&str>) -> Self {
        Self {
            queue: settings.queue.clone(),
            account: account
                .map(str::to_string)
                .or_else(|| settings.account.clone()),
            options: settings.options.clone(),
        }
    }
}

#[async_trait]
impl SchedulerClient for SlurmClient {
    async fn submit(&self, builder: &Builder) -> anyhow::Result<String> {
        let mut args = vec!["--parsable".to_string()];
        if let Some(queue) = &self.queue {
            args.push("-p".to_string());
            args.push(queue.clone());
        }
        if let Some(account) = &self.account {
            args.push("-A".to_string());
            args.push(account.clone());
        }
        args.extend(self.options.iter().cloned());
        args.push(builder.script.display().to_string());

        let stdout = run_command("sbatch", &args).await?;

        // `--parsable` prints "<jobid>" or "<jobid>;<cluster>".
        let job_id = stdout
            .split(';')
            .next()
            .unwrap_or(&stdout)
            .trim()
            .to_string();
        if job_id.is_empty() {
            bail!("sbatch returned no job id");
        }
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> anyhow::Result<String> {
        let args = vec![
            "-j".to_string(),
            job_id.to_string(),
            "-X".to_string(),
            "-n".to_string(),
            "-P".to_string(),
            "-o".to_string(),
            "State".to_string(),
        ];
        let stdout = run_command("sacct", &args).await?;
        first_token(&stdout, "slurm job state")
    }

    async fn cancel(&self, job_id: &str) -> anyhow::Result<()> {
        run_command("scancel", &[job_id.to_string()]).await?;
        Ok(())
    }

    fn classify(&self, label: &str) -> JobState {
        match label {
            "COMPLETED" => JobState::Complete,
            "FAILED" | "CANCELLED" | "TIMEOUT" | "NODE_FAIL" | "OUT_OF_MEMORY" | "PREEMPTED"
            | "BOOT_FAIL" | "DEADLINE" => JobState::Failed,
            _ => JobState::Incomplete,
        }
    }

    fn is_pend_label(&self, label: &str) -> bool {
        matches!(label, "PENDING" | "SUSPENDED" | "REQUEUED")
    }
}

/// PBS client: `qsub` / `qstat` / `qdel`.
pub struct PbsClient {
    queue: Option<String>,
    account: Option<String>,
    options: Vec<String>,
}

impl PbsClient {
    pub fn from_settings(settings: &ExecutorSettings, account: Option<&str>) -> Self {
        Self {
            queue: settings.queue.clone(),
            account: account
                .map(str::to_string)
                .or_else(|| settings.account.clone()),
            options: settings.options.clone(),
        }
    }
}

#[async_trait]
impl SchedulerClient for PbsClient {
    async fn submit(&self, builder: &Builder) -> anyhow::Result<String> {
        let mut args = Vec::new();
        if let Some(queue) = &self.queue {
            args.push("-q".to_string());
            args.push(queue.clone());
        }
        if let Some(account) = &self.account {
            args.push("-A".to_string());
            args.push(account.clone());
        }
        args.extend(self.options.iter().cloned());
        args.push(builder.script.display().to_string());

        let stdout = run_command("qsub", &args).await?;
        first_token(&stdout, "pbs job id")
    }

    async fn status(&self, job_id: &str) -> anyhow::Result<String> {
        let args = vec!["-x".to_string(), "-f".to_string(), job_id.to_string()];
        let stdout = run_command("qstat", &args).await?;

        // `qstat -f` prints "    job_state = R" among other attributes.
        for line in stdout.lines() {
            if let Some((key, value)) = line.split_once('=') {
                if key.trim() == "job_state" {
                    return Ok(value.trim().to_string());
                }
            }
        }
        bail!("no job_state attribute in qstat output for job {job_id}");
    }

    async fn cancel(&self, job_id: &str) -> anyhow::Result<()> {
        run_command("qdel", &[job_id.to_string()]).await?;
        Ok(())
    }

    fn classify(&self, label: &str) -> JobState {
        match label {
            // Finished; PBS reports failure only through the exit status,
            // which the registry-level contract does not inspect.
            "F" => JobState::Complete,
            _ => JobState::Incomplete,
        }
    }

    fn is_pend_label(&self, label: &str) -> bool {
        matches!(label, "Q" | "H" | "S" | "W")
    }
}

/// LSF client: `bsub` / `bjobs` / `bkill`.
pub struct LsfClient {
    queue: Option<String>,
    account: Option<String>,
    options: Vec<String>,
}

impl LsfClient {
    pub fn from_settings(settings: &ExecutorSettings, account: Option<&str>) -> Self {
        Self {
            queue: settings.queue.clone(),
            account: account
                .map(str::to_string)
                .or_else(|| settings.account.clone()),
            options: settings.options.clone(),
        }
    }
}

#[async_trait]
impl SchedulerClient for LsfClient {
    async fn submit(&self, builder: &Builder) -> anyhow::Result<String> {
        let mut args = Vec::new();
        if let Some(queue) = &self.queue {
            args.push("-q".to_string());
            args.push(queue.clone());
        }
        if let Some(account) = &self.account {
            args.push("-P".to_string());
            args.push(account.clone());
        }
        args.extend(self.options.iter().cloned());
        args.push(builder.script.display().to_string());

        let stdout = run_command("bsub", &args).await?;

        // bsub prints: Job <1234> is submitted to queue <normal>.
        let job_id = stdout
            .split_once('<')
            .and_then(|(_, rest)| rest.split_once('>'))
            .map(|(id, _)| id.to_string())
            .with_context(|| format!("no job id in bsub output: {stdout}"))?;
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> anyhow::Result<String> {
        let args = vec![
            "-noheader".to_string(),
            "-o".to_string(),
            "stat".to_string(),
            job_id.to_string(),
        ];
        let stdout = run_command("bjobs", &args).await?;
        first_token(&stdout, "lsf job state")
    }

    async fn cancel(&self, job_id: &str) -> anyhow::Result<()> {
        run_command("bkill", &[job_id.to_string()]).await?;
        Ok(())
    }

    fn classify(&self, label: &str) -> JobState {
        match label {
            "DONE" => JobState::Complete,
            "EXIT" | "ZOMBI" => JobState::Failed,
            _ => JobState::Incomplete,
        }
    }

    fn is_pend_label(&self, label: &str) -> bool {
        matches!(label, "PEND" | "PSUSP" | "USUSP" | "SSUSP")
    }
}
