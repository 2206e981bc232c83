// src/exec/mod.rs

//! Target execution layer.
//!
//! - [`engine`] runs a single target: it reads the category sources, pushes
//!   them through the target's pipeline and writes the results. It can also
//!   drive a whole build plan.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`, which tests replace with a fake.

pub mod backend;
pub mod engine;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use engine::{ExecutionEngine, TargetReport};
