// src/engine/mod.rs

//! Orchestration engine for assetflow.
//!
//! This module ties together:
//! - the initial build plan (`clean`, then every asset target)
//! - per-target coalescing of watch triggers ([`queue`])
//! - the main runtime event loop that reacts to:
//!   - the start request
//!   - file-watch triggers
//!   - target completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;

/// Canonical target name type used throughout the engine.
pub type TargetName = String;

/// Outcome of one target execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Success,
    Failed(String),
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetOutcome::Success)
    }
}

/// Why a target was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested explicitly (CLI, tests).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Dispatcher state as seen from outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Nothing started yet.
    Idle,
    /// The initial plan or at least one rebuild is in flight.
    Building,
    /// Waiting for file changes.
    Watching,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatcherState::Idle => "idle",
            DispatcherState::Building => "building",
            DispatcherState::Watching => "watching",
        };
        f.write_str(s)
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit once the initial plan has completed (`assetflow build`).
    /// Otherwise start watching.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the CLI, watcher and executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run the full build plan.
    StartRequested,
    /// A target should be re-run.
    TargetTriggered {
        target: TargetName,
        reason: TriggerReason,
    },
    /// A target execution finished.
    TargetCompleted {
        target: TargetName,
        outcome: TargetOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod report;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use report::BuildReport;
pub use runtime::{Runtime, WatchStarter};
