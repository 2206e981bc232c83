use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetflow::engine::{RuntimeEvent, TargetOutcome};
use assetflow::errors::Result;
use assetflow::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// What the fake executor saw.
#[derive(Debug, Default)]
struct LogState {
    runs: Vec<String>,
    running: HashMap<String, usize>,
    overlaps: usize,
}

/// Shared view of a [`FakeExecutor`]'s history.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    state: Arc<Mutex<LogState>>,
}

impl ExecutionLog {
    /// Targets in dispatch order.
    pub fn runs(&self) -> Vec<String> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn count(&self, target: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .runs
            .iter()
            .filter(|t| *t == target)
            .count()
    }

    /// Number of times a target was dispatched while already running.
    pub fn overlaps(&self) -> usize {
        self.state.lock().unwrap().overlaps
    }

    fn start(&self, target: &str) {
        let mut state = self.state.lock().unwrap();
        state.runs.push(target.to_string());
        let running = state.running.entry(target.to_string()).or_default();
        *running += 1;
        if *running > 1 {
            state.overlaps += 1;
        }
    }

    fn finish(&self, target: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(running) = state.running.get_mut(target) {
            *running = running.saturating_sub(1);
        }
    }
}

/// A fake executor that:
/// - records which targets were "run"
/// - reports `TargetCompleted` for each of them, after an optional delay,
///   failing the ones marked with [`FakeExecutor::failing`].
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    log: ExecutionLog,
    failing: BTreeSet<String>,
    delay: Option<Duration>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            log: ExecutionLog::default(),
            failing: BTreeSet::new(),
            delay: None,
        }
    }

    pub fn failing(mut self, target: &str) -> Self {
        self.failing.insert(target.to_string());
        self
    }

    /// Complete every run only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn log(&self) -> ExecutionLog {
        self.log.clone()
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_targets(
        &mut self,
        targets: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for target in targets {
                self.log.start(&target);

                let outcome = if self.failing.contains(&target) {
                    TargetOutcome::Failed(format!("{target}: simulated failure"))
                } else {
                    TargetOutcome::Success
                };
                let tx = self.runtime_tx.clone();
                let log = self.log.clone();
                let delay = self.delay;

                tokio::spawn(async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    log.finish(&target);
                    let _ = tx
                        .send(RuntimeEvent::TargetCompleted { target, outcome })
                        .await;
                });
            }
            Ok(())
        })
    }
}
