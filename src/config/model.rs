// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// poll_interval = 30
/// num_procs = 4
///
/// [executor.local.bash]
/// before_script = "export FOO=1"
///
/// [executor.slurm.normal]
/// queue = "normal"
/// account = "dev"
/// max_pend_time = 90
///
/// [executor.slurm.normal.module]
/// purge = true
/// load = ["gcc/9.3"]
/// ```
///
/// This is the *raw* deserialized form; semantic validation happens in
/// [`crate::config::validate`], which produces a [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All executors from `[executor.<kind>.<name>]`.
    #[serde(default)]
    pub executor: ExecutorTable,
}

/// Validated configuration.
///
/// Constructed only through `ConfigFile::try_from(RawConfigFile)`, so holders
/// can rely on the invariants checked in `validate`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub executor: ExecutorTable,
}

impl ConfigFile {
    /// Construct without validation. Only `validate` should call this.
    pub(crate) fn new_unchecked(config: ConfigSection, executor: ExecutorTable) -> Self {
        Self { config, executor }
    }

    /// Iterate over every configured executor as `(kind, name, settings)`.
    pub fn executors(&self) -> impl Iterator<Item = (ExecutorKind, &str, &ExecutorSettings)> {
        let local = self
            .executor
            .local
            .iter()
            .map(|(n, s)| (ExecutorKind::Local, n.as_str(), s));
        let slurm = self
            .executor
            .slurm
            .iter()
            .map(|(n, s)| (ExecutorKind::Slurm, n.as_str(), s));
        let pbs = self
            .executor
            .pbs
            .iter()
            .map(|(n, s)| (ExecutorKind::Pbs, n.as_str(), s));
        let lsf = self
            .executor
            .lsf
            .iter()
            .map(|(n, s)| (ExecutorKind::Lsf, n.as_str(), s));

        local.chain(slurm).chain(pbs).chain(lsf)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Seconds between poll cycles for outstanding batch jobs.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Number of worker tasks used for submission.
    ///
    /// If unset, the host's available parallelism is used. Always clamped to
    /// the host's available parallelism at run time.
    #[serde(default)]
    pub num_procs: Option<usize>,

    /// Root directory under which per-executor directories are created.
    #[serde(default = "default_executor_root")]
    pub executor_root: PathBuf,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_executor_root() -> PathBuf {
    PathBuf::from("var/executors")
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            num_procs: None,
            executor_root: default_executor_root(),
        }
    }
}

/// `[executor]` table, one sub-table per backend kind.
///
/// Keys of the inner maps are the *executor names* (e.g. `"bash"`,
/// `"normal"`). Names must be unique across kinds; `validate` enforces this.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExecutorTable {
    #[serde(default)]
    pub local: BTreeMap<String, ExecutorSettings>,

    #[serde(default)]
    pub slurm: BTreeMap<String, ExecutorSettings>,

    #[serde(default)]
    pub pbs: BTreeMap<String, ExecutorSettings>,

    #[serde(default)]
    pub lsf: BTreeMap<String, ExecutorSettings>,
}

/// Kind of executor backend, derived from the config sub-table the executor
/// was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    Local,
    Slurm,
    Pbs,
    Lsf,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutorKind::Local => "local",
            ExecutorKind::Slurm => "slurm",
            ExecutorKind::Pbs => "pbs",
            ExecutorKind::Lsf => "lsf",
        };
        write!(f, "{s}")
    }
}

/// Per-executor settings from `[executor.<kind>.<name>]`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExecutorSettings {
    /// Free-form description, shown in `--dry-run` output.
    #[serde(default)]
    pub description: Option<String>,

    /// Queue / partition to submit batch jobs to.
    #[serde(default)]
    pub queue: Option<String>,

    /// Account to charge batch jobs to.
    ///
    /// A CLI-level `--account` overrides this.
    #[serde(default)]
    pub account: Option<String>,

    /// Maximum time in seconds a job may sit in a queued (non-running) state
    /// before the executor cancels it during poll.
    #[serde(default)]
    pub max_pend_time: Option<u64>,

    /// Extra arguments appended to the scheduler submit command.
    #[serde(default)]
    pub options: Vec<String>,

    /// Raw shell text appended to the generated `before_script.sh`.
    #[serde(default)]
    pub before_script: Option<String>,

    /// Module environment preparation.
    #[serde(default)]
    pub module: Option<ModuleSettings>,
}

/// `[executor.<kind>.<name>.module]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModuleSettings {
    /// Run `module purge` before anything else.
    #[serde(default)]
    pub purge: bool,

    /// `module swap <a> <b>`; must hold exactly two entries when set.
    #[serde(default)]
    pub swap: Vec<String>,

    /// `module load <x>` per entry.
    #[serde(default)]
    pub load: Vec<String>,
}

impl ModuleSettings {
    /// Generate the shell commands for this module spec, in execution order:
    /// purge, then swap, then loads.
    pub fn commands(&self) -> Vec<String> {
        let mut cmds = Vec::new();

        if self.purge {
            cmds.push("module purge".to_string());
        }

        if let [from, to] = self.swap.as_slice() {
            cmds.push(format!("module swap {from} {to}"));
        }

        for name in &self.load {
            cmds.push(format!("module load {name}"));
        }

        cmds
    }
}
