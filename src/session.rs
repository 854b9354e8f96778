// src/session.rs

//! The per-process build run session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::state::{BuildState, FailureTracker};
use crate::types::{Env, TaskName};

/// Shared handle to this process's [`FailureTracker`].
///
/// Constructed once per process and handed to the task interceptor and the
/// lifecycle handler. Clones refer to the same tracker; separate processes
/// (workers) each build their own.
#[derive(Debug, Clone)]
pub struct BuildRunSession {
    tracker: Arc<Mutex<FailureTracker>>,
}

impl BuildRunSession {
    pub fn new(env: Env) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(FailureTracker::new(env))),
        }
    }

    pub fn env(&self) -> Env {
        self.lock().env()
    }

    pub fn begin_task(&self, name: &str) {
        self.lock().begin_task(name);
    }

    /// See [`FailureTracker::mark_failed`].
    pub fn mark_failed(&self, name: Option<&str>) -> TaskName {
        self.lock().mark_failed(name)
    }

    pub fn current_task(&self) -> Option<TaskName> {
        self.lock().current_task().map(str::to_string)
    }

    pub fn is_failed(&self, name: &str) -> bool {
        self.lock().is_failed(name)
    }

    pub fn snapshot(&self) -> BuildState {
        self.lock().snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, FailureTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
