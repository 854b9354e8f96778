// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::state::DEFAULT_STATE_FILE;

/// Task file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// state_file = ".build-state"
/// disabled = ["docs"]
///
/// [task.lint]
/// cmd = "cargo clippy"
///
/// [task.build]
/// cmd = "cargo build"
/// after = ["lint"]
/// ```
///
/// All sections are optional in the file; validation requires at least one
/// task.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated task file: dependencies exist and form a DAG.
///
/// Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Where the previous build's state is kept, relative to the task file.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Tasks that keep their place in the graph but do nothing when run.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl ConfigSection {
    pub fn is_disabled(&self, task: &str) -> bool {
        self.disabled.iter().any(|t| t == task)
    }
}

fn default_state_file() -> String {
    DEFAULT_STATE_FILE.to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            disabled: Vec::new(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Shell command to run. A task without one only groups its
    /// dependencies.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,
}
