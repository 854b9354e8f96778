// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::errors::{BuildError, Result};
use crate::types::TaskName;

#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one runs.
    deps: Vec<TaskName>,
}

/// Dependency lists keyed by task name.
///
/// Acyclicity is checked in `config::validate`; this only keeps adjacency
/// information for ordering.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build a DAG from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::from_edges(
            cfg.task
                .iter()
                .map(|(name, task)| (name.clone(), task.after.clone())),
        )
    }

    /// Build a DAG from `(task, dependencies)` pairs. Dependencies that are
    /// not themselves listed are ignored.
    pub fn from_edges<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = (TaskName, Vec<TaskName>)>,
    {
        Self {
            nodes: tasks
                .into_iter()
                .map(|(name, deps)| (name, DagNode { deps }))
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// `targets` plus everything they transitively depend on.
    ///
    /// An empty `targets` selects every task.
    pub fn with_dependencies(&self, targets: &[TaskName]) -> Result<BTreeSet<TaskName>> {
        if targets.is_empty() {
            return Ok(self.nodes.keys().cloned().collect());
        }

        let mut selected = BTreeSet::new();
        let mut stack: Vec<TaskName> = Vec::new();
        for target in targets {
            if !self.contains(target) {
                return Err(BuildError::TaskNotFound(target.clone()));
            }
            stack.push(target.clone());
        }

        while let Some(name) = stack.pop() {
            if selected.insert(name.clone()) {
                stack.extend(
                    self.dependencies_of(&name)
                        .iter()
                        .filter(|dep| self.contains(dep))
                        .cloned(),
                );
            }
        }
        Ok(selected)
    }

    /// Dependency order over `subset`: every task after the tasks it depends
    /// on, ties broken by name. Edges leaving the subset are ignored.
    pub fn topo_order(&self, subset: &BTreeSet<TaskName>) -> Result<Vec<TaskName>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in subset {
            graph.add_node(name.as_str());
        }
        for name in subset {
            for dep in self.dependencies_of(name) {
                if subset.contains(dep) {
                    graph.add_edge(dep.as_str(), name.as_str(), ());
                }
            }
        }

        let mut waiting: HashMap<&str, usize> = graph
            .nodes()
            .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();
        let mut ready: BTreeSet<&str> = waiting
            .iter()
            .filter(|(_, deps)| **deps == 0)
            .map(|(n, _)| *n)
            .collect();

        let mut order = Vec::with_capacity(subset.len());
        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            for dependent in graph.neighbors_directed(name, Direction::Outgoing) {
                if let Some(deps) = waiting.get_mut(dependent) {
                    *deps -= 1;
                    if *deps == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != subset.len() {
            let stuck = subset
                .iter()
                .find(|n| !order.contains(*n))
                .cloned()
                .unwrap_or_default();
            return Err(BuildError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                stuck
            )));
        }
        Ok(order)
    }
}
