// src/config/validate.rs

use std::collections::BTreeSet;

use crate::config::model::{ConfigFile, ExecutorSettings, RawConfigFile};
use crate::errors::{JobfanError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = JobfanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.executor))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_executors(cfg)?;
    validate_global_config(cfg)?;
    validate_executor_names(cfg)?;
    validate_executor_settings(cfg)?;
    Ok(())
}

fn ensure_has_executors(cfg: &RawConfigFile) -> Result<()> {
    let e = &cfg.executor;
    if e.local.is_empty() && e.slurm.is_empty() && e.pbs.is_empty() && e.lsf.is_empty() {
        return Err(JobfanError::ConfigError(
            "config must contain at least one [executor.<kind>.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.poll_interval == 0 {
        return Err(JobfanError::ConfigError(
            "[config].poll_interval must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.num_procs == Some(0) {
        return Err(JobfanError::ConfigError(
            "[config].num_procs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

/// Executor names are the registry keys, so they must be unique across all
/// backend kinds, not just within one kind.
fn validate_executor_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    let e = &cfg.executor;
    let all = e
        .local
        .keys()
        .chain(e.slurm.keys())
        .chain(e.pbs.keys())
        .chain(e.lsf.keys());

    for name in all {
        if !seen.insert(name.as_str()) {
            return Err(JobfanError::ConfigError(format!(
                "executor name '{name}' is declared under more than one kind"
            )));
        }
    }

    Ok(())
}

fn validate_executor_settings(cfg: &RawConfigFile) -> Result<()> {
    let e = &cfg.executor;
    let all = e
        .local
        .iter()
        .chain(e.slurm.iter())
        .chain(e.pbs.iter())
        .chain(e.lsf.iter());

    for (name, settings) in all {
        validate_settings(name, settings)?;
    }

    Ok(())
}

fn validate_settings(name: &str, settings: &ExecutorSettings) -> Result<()> {
    if let Some(module) = &settings.module {
        if !module.swap.is_empty() && module.swap.len() != 2 {
            return Err(JobfanError::ConfigError(format!(
                "executor '{}' has module.swap with {} entries (expected exactly 2)",
                name,
                module.swap.len()
            )));
        }
    }

    if settings.max_pend_time == Some(0) {
        return Err(JobfanError::ConfigError(format!(
            "executor '{name}' has max_pend_time = 0 (expected >= 1)"
        )));
    }

    Ok(())
}
