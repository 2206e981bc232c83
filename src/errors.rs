// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::engine::TargetName;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown asset category: {0}")]
    UnknownCategory(String),

    #[error("Cycle detected in task graph: {0}")]
    CycleDetected(String),

    #[error("Target '{target}' failed: {cause}")]
    TargetFailed { target: TargetName, cause: String },

    #[error("File watch setup failed: {0}")]
    WatchSetupFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Shorthand for a per-target failure.
    pub fn target_failed(target: impl Into<TargetName>, cause: impl ToString) -> Self {
        PipelineError::TargetFailed {
            target: target.into(),
            cause: cause.to_string(),
        }
    }
}

/// Failure of a single transform step inside a target pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{step}: {message}")]
pub struct TransformError {
    pub step: String,
    pub message: String,
}

impl TransformError {
    pub fn new(step: impl Into<String>, message: impl ToString) -> Self {
        Self {
            step: step.into(),
            message: message.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
