// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the path table (`model.rs`).
//! - Load a config file from disk, falling back to defaults (`loader.rs`).
//! - Validate categories, globs and `after` references (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, PathConfig, PathTable, ProjectSection, RawConfigFile, RawPathConfig,
    ServerSection,
};
