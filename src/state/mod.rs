// src/state/mod.rs

//! Build-state memory.
//!
//! - [`model`] holds the persisted [`BuildState`] snapshot shape.
//! - [`tracker`] records which tasks failed during this process.
//! - [`store`] persists the last snapshot in a single-slot store.

pub mod model;
pub mod store;
pub mod tracker;

pub use model::BuildState;
pub use store::{DEFAULT_STATE_FILE, FileStateStore, MemoryStateStore, StateStore};
pub use tracker::{FailureTracker, UNATTRIBUTED_TASK};
