// src/state/tracker.rs

//! Per-process record of task failures.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::state::model::BuildState;
use crate::types::{Env, TaskName};

/// Name a failure is recorded under when no task has begun yet.
///
/// A crash during startup still counts as a failed build, so the next run's
/// smart-build gate sees it.
pub const UNATTRIBUTED_TASK: &str = "<startup>";

/// Maps every task begun in this process to whether its latest attempt
/// failed, and remembers the task that began most recently.
///
/// Entries keep the position of the first time a task began, so
/// [`snapshot`](Self::snapshot) lists failures in a stable order.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    env: Env,
    entries: Vec<(TaskName, bool)>,
    index: HashMap<TaskName, usize>,
    current: Option<TaskName>,
}

impl FailureTracker {
    pub fn new(env: Env) -> Self {
        Self {
            env,
            entries: Vec::new(),
            index: HashMap::new(),
            current: None,
        }
    }

    pub fn env(&self) -> Env {
        self.env
    }

    /// Task that began most recently, if any.
    pub fn current_task(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Record a fresh attempt of `name`: not failed, and now current.
    pub fn begin_task(&mut self, name: &str) {
        *self.slot(name) = false;
        self.current = Some(name.to_string());
        debug!(task = %name, "task began");
    }

    /// Mark `name` (or the current task when `None`) as failed.
    ///
    /// Before any task has begun the failure goes to [`UNATTRIBUTED_TASK`].
    /// Returns the task that was marked.
    pub fn mark_failed(&mut self, name: Option<&str>) -> TaskName {
        let target = match name.or(self.current.as_deref()) {
            Some(target) => target.to_string(),
            None => {
                warn!(task = UNATTRIBUTED_TASK, "failure reported before any task began");
                UNATTRIBUTED_TASK.to_string()
            }
        };

        let flag = self.slot(&target);
        if !*flag {
            *flag = true;
            debug!(task = %target, "task marked failed");
        }
        target
    }

    pub fn is_failed(&self, name: &str) -> bool {
        self.index
            .get(name)
            .map(|&i| self.entries[i].1)
            .unwrap_or(false)
    }

    /// Current [`BuildState`]: failed tasks in first-begun order.
    pub fn snapshot(&self) -> BuildState {
        BuildState {
            env: self.env,
            failed_tasks: self
                .entries
                .iter()
                .filter(|(_, failed)| *failed)
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }

    fn slot(&mut self, name: &str) -> &mut bool {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.entries.push((name.to_string(), false));
                let i = self.entries.len() - 1;
                self.index.insert(name.to_string(), i);
                i
            }
        };
        &mut self.entries[i].1
    }
}
