// src/state/store.rs

//! Single-slot persistence for the last [`BuildState`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::fs::{FileSystem, RealFileSystem};
use crate::state::model::BuildState;

/// Default state file name, relative to the task file's directory.
pub const DEFAULT_STATE_FILE: &str = ".build-state";

/// Abstract storage for the previous build's outcome.
///
/// There is exactly one slot: every `save` overwrites it.
pub trait StateStore: Send + Sync {
    /// The stored snapshot, or `None` when nothing usable is stored.
    ///
    /// A missing, unreadable or malformed slot is reported as `None`, never
    /// as an error.
    fn load(&self) -> Option<BuildState>;

    /// Overwrite the slot with `state`.
    fn save(&self, state: &BuildState) -> Result<()>;
}

/// Stores the snapshot as a JSON file.
#[derive(Debug, Clone)]
pub struct FileStateStore<F: FileSystem = RealFileSystem> {
    fs: F,
    path: PathBuf,
}

impl FileStateStore<RealFileSystem> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fs(RealFileSystem, path)
    }
}

impl<F: FileSystem> FileStateStore<F> {
    pub fn with_fs(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<F: FileSystem> StateStore for FileStateStore<F> {
    fn load(&self) -> Option<BuildState> {
        if !self.fs.exists(&self.path) {
            debug!(path = ?self.path, "no previous build state");
            return None;
        }

        let contents = match self.fs.read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = ?self.path, error = %err, "unreadable build state; ignoring");
                return None;
            }
        };

        match serde_json::from_str::<BuildState>(&contents) {
            Ok(state) => {
                debug!(path = ?self.path, ?state, "loaded previous build state");
                Some(state)
            }
            Err(err) => {
                warn!(path = ?self.path, error = %err, "malformed build state; ignoring");
                None
            }
        }
    }

    fn save(&self, state: &BuildState) -> Result<()> {
        let json = serde_json::to_string(state).context("serializing build state")?;
        self.fs
            .write(&self.path, json.as_bytes())
            .with_context(|| format!("saving build state to {:?}", self.path))?;
        info!(
            path = ?self.path,
            env = %state.env,
            failed = state.failed_tasks.len(),
            "stored build state"
        );
        Ok(())
    }
}

/// Keeps the snapshot in memory only (lost on exit).
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    slot: Mutex<Option<BuildState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a previous build's state.
    pub fn with_state(state: BuildState) -> Self {
        Self {
            slot: Mutex::new(Some(state)),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Option<BuildState> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, state: &BuildState) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        debug!(?state, "stored build state (memory)");
        Ok(())
    }
}
