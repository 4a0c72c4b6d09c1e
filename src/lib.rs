// src/lib.rs

pub mod builder;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod registry;
pub mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::builder::Builder;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::ConfigFile;
use crate::orchestrator::Orchestrator;
use crate::registry::ExecutorRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - executor registry construction + setup
/// - builder construction from the script arguments
/// - submission (worker pool) and polling (convergence loop)
/// - the final report
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let Some(executor) = args.executor.as_deref() else {
        bail!("--executor is required unless --dry-run is given");
    };
    if args.scripts.is_empty() {
        bail!("at least one script is required unless --dry-run is given");
    }

    let registry =
        ExecutorRegistry::initialize(&cfg, args.account.as_deref(), args.max_pend_time)?;

    let poll_interval = args.poll_interval.unwrap_or(cfg.config.poll_interval);
    let num_procs = args.procs.or(cfg.config.num_procs);

    let builders = builders_from_scripts(executor, &args.scripts)?;
    info!(
        builders = builders.len(),
        executor = %executor,
        "submitting builders"
    );

    let mut orchestrator = Orchestrator::new(
        registry,
        Duration::from_secs(poll_interval),
        num_procs,
    );

    orchestrator.run(builders).await?;
    orchestrator.poll().await?;

    report::print_completed_jobs(orchestrator.completed());

    summarize(&orchestrator)
}

/// One builder per script argument, named after the script's file stem.
fn builders_from_scripts(executor: &str, scripts: &[String]) -> Result<Vec<Builder>> {
    let mut builders = Vec::new();

    for script in scripts {
        let path = PathBuf::from(script);
        if !path.is_file() {
            bail!("script not found: {script}");
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.clone());

        builders.push(Builder::new(name, executor, path));
    }

    Ok(builders)
}

/// Exit non-zero when any builder was cancelled, failed to submit, or
/// finished with a failing exit code.
fn summarize(orchestrator: &Orchestrator) -> Result<()> {
    let cancelled = orchestrator.cancelled().len();
    let submission_failed = orchestrator.submission_failed().len();
    let failed = orchestrator
        .get_valid_builders()
        .iter()
        .filter(|b| b.result.as_ref().is_some_and(|r| !r.success()))
        .count();

    debug!(cancelled, submission_failed, failed, "run summary");

    if cancelled + submission_failed + failed > 0 {
        bail!(
            "{failed} builder(s) failed, {cancelled} cancelled, {submission_failed} failed to submit"
        );
    }

    Ok(())
}

/// Simple dry-run output: print global config and the executor table.
fn print_dry_run(cfg: &ConfigFile) {
    println!("jobfan dry-run");
    println!("  config.poll_interval = {}", cfg.config.poll_interval);
    if let Some(procs) = cfg.config.num_procs {
        println!("  config.num_procs = {procs}");
    }
    println!(
        "  config.executor_root = {}",
        cfg.config.executor_root.display()
    );
    println!();

    let executors: Vec<_> = cfg.executors().collect();
    println!("executors ({}):", executors.len());
    for (kind, name, settings) in executors {
        println!("  - {name} [{kind}]");
        if let Some(ref description) = settings.description {
            println!("      description: {description}");
        }
        if let Some(ref queue) = settings.queue {
            println!("      queue: {queue}");
        }
        if let Some(ref account) = settings.account {
            println!("      account: {account}");
        }
        if let Some(max_pend_time) = settings.max_pend_time {
            println!("      max_pend_time: {max_pend_time}");
        }
        if !settings.options.is_empty() {
            println!("      options: {:?}", settings.options);
        }
        if let Some(ref module) = settings.module {
            for cmd in module.commands() {
                println!("      module: {cmd}");
            }
        }
        if settings.before_script.is_some() {
            println!("      before_script: <set>");
        }
    }

    debug!("dry-run complete (no execution)");
}
