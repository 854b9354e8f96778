// src/engine/plan.rs

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::args::PropagatedArgs;
use crate::config::ConfigFile;
use crate::dag::DagGraph;
use crate::exec::{Task, command_body, worker_body};
use crate::types::TaskName;

/// How task commands are carried out.
#[derive(Debug, Clone)]
pub enum ExecutionStrategy {
    /// Run each command through the shell in this process.
    InProcess,
    /// Re-invoke `exe` as a worker for each task.
    Workers { exe: PathBuf, args: PropagatedArgs },
}

/// Tasks and their dependency graph, ready to run.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    graph: DagGraph,
    tasks: HashMap<TaskName, Task>,
}

impl BuildPlan {
    pub fn new(graph: DagGraph, tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            graph,
            tasks: tasks.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Build tasks from the task file. Tasks without `cmd`, and tasks listed
    /// in `[config].disabled`, become pass-through tasks under either
    /// strategy.
    pub fn from_config(cfg: &ConfigFile, strategy: &ExecutionStrategy) -> Self {
        let tasks = cfg.task.iter().map(|(name, task)| match (&task.cmd, strategy) {
            _ if cfg.config.is_disabled(name) => {
                debug!(task = %name, "task disabled; running as pass-through");
                Task::pass_through(name.clone())
            }
            (None, _) => Task::pass_through(name.clone()),
            (Some(cmd), ExecutionStrategy::InProcess) => {
                Task::new(name.clone(), command_body(name.clone(), cmd.clone()))
            }
            (Some(_), ExecutionStrategy::Workers { exe, args }) => Task::new(
                name.clone(),
                worker_body(name.clone(), exe.clone(), args.clone()),
            ),
        });
        Self::new(DagGraph::from_config(cfg), tasks)
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }
}
