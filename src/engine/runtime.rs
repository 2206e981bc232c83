// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::reload::{NoopReload, ReloadNotifier};
use crate::watch::WatcherHandle;

use super::core::CoreRuntime;
use super::report::BuildReport;
use super::{CoreCommand, RuntimeEvent, TargetName};

/// Deferred watcher setup, run when the core emits `StartWatching`.
pub type WatchStarter = Box<dyn FnOnce() -> Result<WatcherHandle> + Send>;

/// Drives the core state machine in response to `RuntimeEvent`s and
/// delegates target execution to an `ExecutorBackend`.
///
/// All dispatch semantics live in `CoreRuntime`; this struct only does IO:
/// reading events, handing targets to the executor, starting the watcher
/// and pushing reload notifications.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    reload: Arc<dyn ReloadNotifier>,
    watch_starter: Option<WatchStarter>,
    watcher: Option<WatcherHandle>,
    report: Option<BuildReport>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reload: Arc::new(NoopReload),
            watch_starter: None,
            watcher: None,
            report: None,
        }
    }

    /// Push reload notifications to `reload` after each successful target.
    pub fn with_reload(mut self, reload: Arc<dyn ReloadNotifier>) -> Self {
        self.reload = reload;
        self
    }

    /// Attach the watcher with `starter` once the initial plan completed.
    pub fn with_watch_starter(mut self, starter: WatchStarter) -> Self {
        self.watch_starter = Some(starter);
        self
    }

    /// Main event loop.
    ///
    /// Returns the report of the full build plan (empty if the loop ended
    /// before the plan completed). Watcher setup failures are fatal.
    pub async fn run(mut self) -> Result<BuildReport> {
        info!("assetflow runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, state = %self.core.state(), "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(self.report.unwrap_or_default())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTargets(targets) => self.spawn_ready(targets).await?,
            CoreCommand::NotifyReload { target } => self.reload.notify(&target),
            CoreCommand::PlanCompleted(report) => {
                for failure in report.failures() {
                    warn!(error = %failure, "plan target failed");
                }
                self.report = Some(report);
            }
            CoreCommand::StartWatching => match self.watch_starter.take() {
                Some(start) => {
                    self.watcher = Some(start()?);
                    info!("watching for changes");
                }
                None => debug!("no watcher configured"),
            },
            CoreCommand::RequestExit => {
                // keep_running is already false for this step.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, targets: Vec<TargetName>) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        debug!(?targets, "dispatching targets");
        self.executor.spawn_ready_targets(targets).await
    }
}
