// src/dag/mod.rs

//! Build targets and the task graph.
//!
//! - [`target`] defines a named unit of build work and its pipeline.
//! - [`graph`] builds one target per asset category plus `clean`, checks the
//!   `after` edges for cycles and keeps adjacency for lookups.
//! - [`plan`] derives the execution plan: sequential groups of targets that
//!   may run in parallel.

pub mod graph;
pub mod plan;
pub mod target;

pub use graph::{build_graph, TaskGraph};
pub use plan::ExecutionPlan;
pub use target::{Target, TargetKind};

/// Name of the target that empties the build root.
pub const CLEAN_TARGET: &str = "clean";
