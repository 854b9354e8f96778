// src/config/mod.rs

//! Task file loading and validation.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads a task file from disk.
//! - [`validate`] checks that dependencies form a DAG.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DEFAULT_CONFIG_FILE, config_root_dir, load_and_validate, load_from_path,
};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
pub use validate::validate_config;
