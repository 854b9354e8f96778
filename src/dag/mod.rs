// src/dag/mod.rs

//! Task dependency graph.

pub mod graph;

pub use graph::DagGraph;
