// src/state/model.rs

use serde::{Deserialize, Serialize};

use crate::types::{Env, TaskName};

/// Outcome of a build as remembered between runs.
///
/// On disk this is `{"env": "DEV", "failedTasks": ["lint"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildState {
    pub env: Env,
    pub failed_tasks: Vec<TaskName>,
}

impl BuildState {
    /// A state with no failures.
    pub fn clean(env: Env) -> Self {
        Self {
            env,
            failed_tasks: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_tasks.is_empty()
    }
}
