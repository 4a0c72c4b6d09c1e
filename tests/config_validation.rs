// tests/config_validation.rs

//! TOML config deserialization, defaults and validation errors.

use jobfan::config::{ConfigFile, RawConfigFile};
use jobfan::errors::JobfanError;

fn parse(toml_text: &str) -> Result<ConfigFile, JobfanError> {
    let raw: RawConfigFile = toml::from_str(toml_text).expect("deserialize");
    ConfigFile::try_from(raw)
}

#[test]
fn defaults_are_applied() {
    let cfg = parse(
        r#"
[executor.local.bash]
"#,
    )
    .expect("valid config");

    assert_eq!(cfg.config.poll_interval, 30);
    assert_eq!(cfg.config.num_procs, None);
    assert_eq!(
        cfg.config.executor_root,
        std::path::PathBuf::from("var/executors")
    );
}

#[test]
fn at_least_one_executor_is_required() {
    let err = parse(
        r#"
[config]
poll_interval = 10
"#,
    )
    .expect_err("no executors");

    assert!(matches!(err, JobfanError::ConfigError(_)));
}

#[test]
fn executor_names_must_be_unique_across_kinds() {
    let err = parse(
        r#"
[executor.local.shared]

[executor.slurm.shared]
"#,
    )
    .expect_err("duplicate name");

    assert!(matches!(err, JobfanError::ConfigError(msg) if msg.contains("shared")));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let err = parse(
        r#"
[config]
poll_interval = 0

[executor.local.bash]
"#,
    )
    .expect_err("poll_interval 0");

    assert!(matches!(err, JobfanError::ConfigError(_)));
}

#[test]
fn zero_num_procs_is_rejected() {
    let err = parse(
        r#"
[config]
num_procs = 0

[executor.local.bash]
"#,
    )
    .expect_err("num_procs 0");

    assert!(matches!(err, JobfanError::ConfigError(_)));
}

#[test]
fn module_swap_must_hold_exactly_two_entries() {
    let err = parse(
        r#"
[executor.slurm.normal.module]
swap = ["just-one"]
"#,
    )
    .expect_err("bad swap arity");

    assert!(matches!(err, JobfanError::ConfigError(msg) if msg.contains("swap")));
}

#[test]
fn zero_max_pend_time_is_rejected() {
    let err = parse(
        r#"
[executor.slurm.normal]
max_pend_time = 0
"#,
    )
    .expect_err("max_pend_time 0");

    assert!(matches!(err, JobfanError::ConfigError(_)));
}

#[test]
fn module_commands_follow_purge_swap_load_order() {
    let cfg = parse(
        r#"
[executor.slurm.normal.module]
purge = true
swap = ["intel", "gcc"]
load = ["gcc/9.3"]
"#,
    )
    .expect("valid config");

    let (_, _, settings) = cfg.executors().next().expect("one executor");
    let cmds = settings.module.as_ref().expect("module set").commands();
    assert_eq!(
        cmds,
        ["module purge", "module swap intel gcc", "module load gcc/9.3"]
    );
}

#[test]
fn executors_iterates_all_kinds() {
    let cfg = parse(
        r#"
[executor.local.a]

[executor.slurm.b]

[executor.pbs.c]

[executor.lsf.d]
"#,
    )
    .expect("valid config");

    let names: Vec<&str> = cfg.executors().map(|(_, name, _)| name).collect();
    assert_eq!(names, ["a", "b", "c", "d"]);
}
