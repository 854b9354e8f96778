// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

/// Reject task files the runner cannot order or persist state for.
///
/// The first problem found is reported.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(invalid("no tasks defined; add a [task.<name>] section"));
    }
    if cfg.config.state_file.trim().is_empty() {
        return Err(invalid("[config].state_file must not be empty"));
    }

    if let Some(name) = cfg.config.disabled.iter().find(|t| !cfg.task.contains_key(*t)) {
        return Err(invalid(format!(
            "[config].disabled names unknown task '{name}'"
        )));
    }

    for (name, task) in &cfg.task {
        if task.after.iter().any(|dep| dep == name) {
            return Err(invalid(format!("task '{name}' lists itself in `after`")));
        }
        if let Some(dep) = task.after.iter().find(|dep| !cfg.task.contains_key(*dep)) {
            return Err(invalid(format!(
                "task '{name}' has unknown dependency '{dep}' in `after`"
            )));
        }
    }

    ensure_acyclic(cfg)
}

fn ensure_acyclic(cfg: &RawConfigFile) -> Result<()> {
    // dependency -> dependent
    let mut graph = DiGraphMap::<&str, ()>::from_edges(cfg.task.iter().flat_map(|(name, task)| {
        task.after.iter().map(move |dep| (dep.as_str(), name.as_str()))
    }));
    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    toposort(&graph, None).map(|_| ()).map_err(|cycle| {
        BuildError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            cycle.node_id()
        ))
    })
}

fn invalid(msg: impl Into<String>) -> BuildError {
    BuildError::ConfigError(msg.into())
}
