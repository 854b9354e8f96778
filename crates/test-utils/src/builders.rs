#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use buildstate::config::{ConfigFile, ConfigSection, DEFAULT_CONFIG_FILE, RawConfigFile, TaskConfig};

/// Builds task files for tests, either as parsed config or as TOML on disk.
#[derive(Debug, Clone, Default)]
pub struct TaskFileBuilder {
    state_file: Option<String>,
    disabled: Vec<String>,
    tasks: BTreeMap<String, TaskConfig>,
}

impl TaskFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_file(mut self, path: &str) -> Self {
        self.state_file = Some(path.to_string());
        self
    }

    pub fn disable(mut self, task: &str) -> Self {
        self.disabled.push(task.to_string());
        self
    }

    /// A task that runs `cmd` after `after`.
    pub fn task(mut self, name: &str, cmd: &str, after: &[&str]) -> Self {
        self.tasks.insert(
            name.to_string(),
            TaskConfig {
                cmd: Some(cmd.to_string()),
                after: after.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    /// A task without a command that only pulls in `after`.
    pub fn group(mut self, name: &str, after: &[&str]) -> Self {
        self.tasks.insert(
            name.to_string(),
            TaskConfig {
                cmd: None,
                after: after.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn raw(&self) -> RawConfigFile {
        let mut config = ConfigSection::default();
        if let Some(path) = &self.state_file {
            config.state_file = path.clone();
        }
        config.disabled = self.disabled.clone();
        RawConfigFile {
            config,
            task: self.tasks.clone(),
        }
    }

    pub fn build(&self) -> ConfigFile {
        ConfigFile::try_from(self.raw()).expect("builder produced an invalid task file")
    }

    /// Render as TOML. Strings are written with Rust escaping, which matches
    /// TOML basic strings for the commands tests use.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        if self.state_file.is_some() || !self.disabled.is_empty() {
            out.push_str("[config]\n");
            if let Some(path) = &self.state_file {
                writeln!(out, "state_file = {path:?}").unwrap();
            }
            if !self.disabled.is_empty() {
                writeln!(out, "disabled = {:?}", self.disabled).unwrap();
            }
            out.push('\n');
        }
        for (name, task) in &self.tasks {
            writeln!(out, "[task.{name}]").unwrap();
            if let Some(cmd) = &task.cmd {
                writeln!(out, "cmd = {cmd:?}").unwrap();
            }
            if !task.after.is_empty() {
                writeln!(out, "after = {:?}", task.after).unwrap();
            }
            out.push('\n');
        }
        out
    }

    /// Write `Buildstate.toml` into `dir` and return its path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, self.to_toml()).expect("writing task file");
        path
    }
}
