// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] contains the typed TOML model (`[config]`, `[executor.*]`).
//! - [`loader`] reads and deserializes config files.
//! - [`validate`] turns a [`model::RawConfigFile`] into a validated
//!   [`model::ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, ExecutorKind, ExecutorSettings, ModuleSettings, RawConfigFile,
};
