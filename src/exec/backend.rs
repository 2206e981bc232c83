// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running targets
//! itself. Production uses `RealExecutorBackend`; tests swap in a fake that
//! records dispatched targets and emits `TargetCompleted` directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::engine::{RuntimeEvent, TargetName, TargetOutcome};
use crate::errors::{PipelineError, Result};

use super::engine::ExecutionEngine;

/// Trait abstracting how dispatched targets are executed.
pub trait ExecutorBackend: Send {
    /// Start the given targets. Each one must eventually produce exactly one
    /// `RuntimeEvent::TargetCompleted`.
    fn spawn_ready_targets(
        &mut self,
        targets: Vec<TargetName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs each target on the blocking pool and reports completion on the
/// runtime channel.
#[derive(Debug, Clone)]
pub struct RealExecutorBackend {
    engine: Arc<ExecutionEngine>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(engine: Arc<ExecutionEngine>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { engine, runtime_tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_targets(
        &mut self,
        targets: Vec<TargetName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for target in targets {
                let engine = Arc::clone(&self.engine);
                let tx = self.runtime_tx.clone();

                tokio::spawn(async move {
                    let name = target.clone();
                    let joined =
                        tokio::task::spawn_blocking(move || engine.run_named(&name)).await;

                    let outcome = match joined {
                        Ok(Ok(report)) => {
                            debug!(target = %target, written = report.files_written.len(), "target run ok");
                            TargetOutcome::Success
                        }
                        Ok(Err(PipelineError::TargetFailed { cause, .. })) => {
                            error!(target = %target, cause = %cause, "target failed");
                            TargetOutcome::Failed(cause)
                        }
                        Ok(Err(other)) => {
                            error!(target = %target, error = %other, "target failed");
                            TargetOutcome::Failed(other.to_string())
                        }
                        Err(join_err) => {
                            error!(target = %target, error = %join_err, "target worker panicked");
                            TargetOutcome::Failed(format!("worker panicked: {join_err}"))
                        }
                    };

                    if tx
                        .send(RuntimeEvent::TargetCompleted { target, outcome })
                        .await
                        .is_err()
                    {
                        debug!("runtime gone before target completion was delivered");
                    }
                });
            }
            Ok(())
        })
    }
}
