// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::dag::TaskGraph;
use crate::engine::queue::TriggerQueue;
use crate::engine::report::BuildReport;
use crate::engine::{
    DispatcherState, RuntimeOptions, TargetName, TargetOutcome, TriggerReason,
};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start executing these targets (concurrently).
    DispatchTargets(Vec<TargetName>),
    /// A target finished successfully and its outputs are written.
    NotifyReload { target: TargetName },
    /// The full plan finished; carries its report.
    PlanCompleted(BuildReport),
    /// Attach the filesystem watcher.
    StartWatching,
    /// Request that the process exits (`assetflow build`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Progress through the full build plan.
#[derive(Debug)]
pub(crate) struct PlanProgress {
    /// Index of the next group to dispatch.
    next_group: usize,
    /// Members of the current group that have not completed yet.
    outstanding: BTreeSet<TargetName>,
    report: BuildReport,
}

/// Mutable dispatch state owned by the core.
#[derive(Debug)]
pub(crate) struct DispatchState {
    pub(crate) state: DispatcherState,
    pub(crate) plan: Option<PlanProgress>,
    pub(crate) in_flight: BTreeSet<TargetName>,
    pub(crate) queue: TriggerQueue,
}

impl DispatchState {
    pub(crate) fn new() -> Self {
        Self {
            state: DispatcherState::Idle,
            plan: None,
            in_flight: BTreeSet::new(),
            queue: TriggerQueue::new(),
        }
    }

    fn dispatch(&mut self, targets: Vec<TargetName>) -> Option<CoreCommand> {
        if targets.is_empty() {
            return None;
        }
        self.in_flight.extend(targets.iter().cloned());
        self.state = DispatcherState::Building;
        Some(CoreCommand::DispatchTargets(targets))
    }
}

/// Handle the start request: begin the full plan.
pub(crate) fn handle_start(
    graph: &TaskGraph,
    ds: &mut DispatchState,
    options: &RuntimeOptions,
) -> CoreStep {
    if ds.state != DispatcherState::Idle {
        warn!(state = %ds.state, "start requested while already started; ignoring");
        return CoreStep::running(Vec::new());
    }

    info!(groups = graph.plan().len(), "starting full build plan");
    ds.state = DispatcherState::Building;
    ds.plan = Some(PlanProgress {
        next_group: 0,
        outstanding: BTreeSet::new(),
        report: BuildReport::new(),
    });

    advance_plan(graph, ds, options)
}

/// Handle a target trigger.
///
/// - Before and during the initial plan, triggers are queued and drained
///   once the plan completes.
/// - While watching, an idle target is dispatched immediately; a busy
///   target gets (at most) one queued follow-up.
pub(crate) fn handle_trigger(
    graph: &TaskGraph,
    ds: &mut DispatchState,
    target: TargetName,
    reason: TriggerReason,
) -> CoreStep {
    if !graph.contains(&target) {
        warn!(target = %target, ?reason, "trigger for unknown target; ignoring");
        return CoreStep::running(Vec::new());
    }

    if ds.state == DispatcherState::Idle || ds.plan.is_some() {
        debug!(target = %target, ?reason, "initial plan not finished; queueing trigger");
        ds.queue.record_trigger(&target);
        return CoreStep::running(Vec::new());
    }

    if ds.in_flight.contains(&target) {
        ds.queue.record_trigger(&target);
        return CoreStep::running(Vec::new());
    }

    info!(target = %target, ?reason, "rebuilding target");
    let commands = ds.dispatch(vec![target]).into_iter().collect();
    CoreStep::running(commands)
}

/// Handle a target completion event.
pub(crate) fn handle_completion(
    graph: &TaskGraph,
    ds: &mut DispatchState,
    options: &RuntimeOptions,
    target: TargetName,
    outcome: TargetOutcome,
) -> CoreStep {
    if !ds.in_flight.remove(&target) {
        warn!(target = %target, "completion for a target that is not in flight; ignoring");
        return CoreStep::running(Vec::new());
    }

    let mut commands = Vec::new();

    match &outcome {
        TargetOutcome::Success => {
            info!(target = %target, "target completed");
            commands.push(CoreCommand::NotifyReload {
                target: target.clone(),
            });
        }
        TargetOutcome::Failed(cause) => {
            warn!(target = %target, cause = %cause, "target failed");
        }
    }

    let in_plan = ds
        .plan
        .as_mut()
        .is_some_and(|p| p.outstanding.remove(&target));

    if in_plan {
        if let Some(progress) = ds.plan.as_mut() {
            progress.report.record(target, outcome);
        }
        let mut step = advance_plan(graph, ds, options);
        commands.append(&mut step.commands);
        return CoreStep {
            commands,
            keep_running: step.keep_running,
        };
    }

    if ds.queue.take(&target) {
        debug!(target = %target, "dispatching queued follow-up run");
        commands.extend(ds.dispatch(vec![target]));
    }

    settle(ds);
    CoreStep::running(commands)
}

/// Move back to `Watching` once nothing is in flight or queued.
fn settle(ds: &mut DispatchState) {
    if ds.plan.is_none()
        && ds.state == DispatcherState::Building
        && ds.in_flight.is_empty()
        && ds.queue.is_empty()
    {
        debug!("all rebuilds finished; watching");
        ds.state = DispatcherState::Watching;
    }
}

/// Dispatch the next plan group once the current one is done, skipping
/// targets whose dependencies failed. Finishes the plan after the last group.
fn advance_plan(
    graph: &TaskGraph,
    ds: &mut DispatchState,
    options: &RuntimeOptions,
) -> CoreStep {
    let mut commands = Vec::new();

    loop {
        let Some(progress) = ds.plan.as_mut() else {
            return CoreStep::running(commands);
        };
        if !progress.outstanding.is_empty() {
            return CoreStep::running(commands);
        }

        let Some(group) = graph.plan().group(progress.next_group) else {
            return finish_plan(ds, options, commands);
        };
        progress.next_group += 1;

        let mut ready = Vec::new();
        for name in group {
            let failed_dep = graph.dependencies_of(name).and_then(|deps| {
                deps.iter().find(|d| {
                    matches!(progress.report.outcome(d), Some(TargetOutcome::Failed(_)))
                })
            });

            match failed_dep {
                Some(dep) => {
                    warn!(target = %name, dependency = %dep, "skipping target: dependency failed");
                    progress.report.record(
                        name.clone(),
                        TargetOutcome::Failed(format!("dependency '{dep}' failed")),
                    );
                }
                None => ready.push(name.clone()),
            }
        }

        progress.outstanding = ready.iter().cloned().collect();
        if !ready.is_empty() {
            debug!(group = progress.next_group - 1, targets = ?ready, "dispatching plan group");
        }
        commands.extend(ds.dispatch(ready));
    }
}

fn finish_plan(
    ds: &mut DispatchState,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    let Some(progress) = ds.plan.take() else {
        return CoreStep::running(commands);
    };
    let report = progress.report;
    info!(
        targets = report.len(),
        failed = report.failures().len(),
        "full build plan completed"
    );
    commands.push(CoreCommand::PlanCompleted(report));

    if options.exit_when_idle {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    commands.push(CoreCommand::StartWatching);
    ds.state = DispatcherState::Watching;

    let queued = ds.queue.drain_pending();
    if !queued.is_empty() {
        info!(targets = ?queued, "running triggers received during the initial plan");
    }
    commands.extend(ds.dispatch(queued));

    CoreStep::running(commands)
}
