// src/watch/mod.rs

//! File watching and source selection.
//!
//! This module is responsible for:
//! - Compiling the per-category `src` / `watch` / `exclude` globs.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning changed paths into target-level triggers.
//!
//! It does **not** know about dependencies between targets or about
//! coalescing; the engine handles both.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{build_bindings, SourceSet, WatchBinding, WatchBindings};
pub use watcher::{spawn_watcher, WatcherHandle};
