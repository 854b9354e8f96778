// src/lifecycle/mod.rs

//! Process lifecycle: turning recorded failures into persisted state and an
//! exit code.
//!
//! [`events`] is the host surface (exit, uncaught error, interrupt) with
//! explicit subscriptions; [`handler`] is what this crate subscribes to it.

pub mod events;
pub mod handler;

pub use events::{
    DEFAULT_ERROR_EXIT_CODE, DEFAULT_INTERRUPT_EXIT_CODE, Disposition, ExitContext, ExitPhase,
    ExitReason, ProcessEvents, Subscription,
};
pub use handler::{LifecycleHandler, LifecyclePhase};
