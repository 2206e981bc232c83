// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated dispatcher state (`Idle`, `Building`, `Watching`)
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - handing dispatched targets to the executor
//! - starting the watcher and pushing live-reload notifications
//!
//! The core has no Tokio types, no channels and performs no IO, so it is
//! unit tested directly.

use crate::dag::TaskGraph;
use crate::engine::event_handlers::{
    handle_completion, handle_start, handle_trigger, CoreStep, DispatchState,
};
use crate::engine::{DispatcherState, RuntimeEvent, RuntimeOptions, TargetName};

/// Pure core runtime state.
#[derive(Debug)]
pub struct CoreRuntime {
    graph: TaskGraph,
    dispatch: DispatchState,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(graph: TaskGraph, options: RuntimeOptions) -> Self {
        Self {
            graph,
            dispatch: DispatchState::new(),
            options,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn state(&self) -> DispatcherState {
        self.dispatch.state
    }

    /// True while the initial full plan is running.
    pub fn plan_active(&self) -> bool {
        self.dispatch.plan.is_some()
    }

    pub fn is_in_flight(&self, target: &str) -> bool {
        self.dispatch.in_flight.contains(target)
    }

    /// Targets currently executing, sorted.
    pub fn in_flight(&self) -> Vec<TargetName> {
        self.dispatch.in_flight.iter().cloned().collect()
    }

    /// Targets with a queued follow-up run.
    pub fn queued(&self) -> Vec<TargetName> {
        self.dispatch.queue.pending()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::StartRequested => {
                handle_start(&self.graph, &mut self.dispatch, &self.options)
            }
            RuntimeEvent::TargetTriggered { target, reason } => {
                handle_trigger(&self.graph, &mut self.dispatch, target, reason)
            }
            RuntimeEvent::TargetCompleted { target, outcome } => handle_completion(
                &self.graph,
                &mut self.dispatch,
                &self.options,
                target,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::dag::build_graph;
    use crate::engine::{CoreCommand, TargetOutcome, TriggerReason};

    fn core(exit_when_idle: bool) -> CoreRuntime {
        let graph = build_graph(&ConfigFile::default()).unwrap();
        CoreRuntime::new(graph, RuntimeOptions { exit_when_idle })
    }

    fn done(core: &mut CoreRuntime, target: &str) -> CoreStep {
        core.step(RuntimeEvent::TargetCompleted {
            target: target.to_string(),
            outcome: TargetOutcome::Success,
        })
    }

    fn trigger(core: &mut CoreRuntime, target: &str) -> CoreStep {
        core.step(RuntimeEvent::TargetTriggered {
            target: target.to_string(),
            reason: TriggerReason::FileWatch,
        })
    }

    const ASSETS: [&str; 6] = ["html", "css", "js", "images", "fonts", "icons"];

    fn finish_initial_plan(core: &mut CoreRuntime) -> Vec<CoreCommand> {
        core.step(RuntimeEvent::StartRequested);
        done(core, "clean");
        let mut last = Vec::new();
        for t in ASSETS {
            last = done(core, t).commands;
        }
        last
    }

    #[test]
    fn start_dispatches_clean_alone() {
        let mut core = core(false);
        let step = core.step(RuntimeEvent::StartRequested);
        assert_eq!(
            step.commands,
            vec![CoreCommand::DispatchTargets(vec!["clean".to_string()])]
        );
        assert_eq!(core.state(), DispatcherState::Building);
    }

    #[test]
    fn build_mode_exits_after_the_plan() {
        let mut core = core(true);
        core.step(RuntimeEvent::StartRequested);
        done(&mut core, "clean");
        for t in &ASSETS[..5] {
            assert!(done(&mut core, t).keep_running);
        }
        let step = done(&mut core, "icons");
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
    }

    #[test]
    fn watch_mode_starts_watching_after_the_plan() {
        let mut core = core(false);
        let last = finish_initial_plan(&mut core);
        assert!(last.contains(&CoreCommand::StartWatching));
        assert_eq!(core.state(), DispatcherState::Watching);
    }

    #[test]
    fn triggers_during_the_plan_run_after_it() {
        let mut core = core(false);
        core.step(RuntimeEvent::StartRequested);
        assert!(trigger(&mut core, "css").commands.is_empty());
        assert!(trigger(&mut core, "css").commands.is_empty());

        done(&mut core, "clean");
        let mut last = Vec::new();
        for t in ASSETS {
            last = done(&mut core, t).commands;
        }
        assert!(last.contains(&CoreCommand::DispatchTargets(vec!["css".to_string()])));
        assert_eq!(core.state(), DispatcherState::Building);
    }

    #[test]
    fn busy_target_gets_exactly_one_follow_up() {
        let mut core = core(false);
        finish_initial_plan(&mut core);

        let first = trigger(&mut core, "css");
        assert_eq!(
            first.commands,
            vec![CoreCommand::DispatchTargets(vec!["css".to_string()])]
        );
        assert!(trigger(&mut core, "css").commands.is_empty());
        assert!(trigger(&mut core, "css").commands.is_empty());
        assert_eq!(core.queued(), vec!["css".to_string()]);

        let step = done(&mut core, "css");
        assert!(step
            .commands
            .contains(&CoreCommand::DispatchTargets(vec!["css".to_string()])));

        let step = done(&mut core, "css");
        assert_eq!(
            step.commands,
            vec![CoreCommand::NotifyReload {
                target: "css".to_string()
            }]
        );
        assert_eq!(core.state(), DispatcherState::Watching);
    }

    #[test]
    fn failed_dependency_is_reported_without_running_dependents() {
        let mut raw = crate::config::RawConfigFile::default();
        raw.paths.insert(
            "html".to_string(),
            crate::config::RawPathConfig {
                after: vec!["css".to_string()],
                ..Default::default()
            },
        );
        let cfg = ConfigFile::try_from(raw).unwrap();
        let mut core = CoreRuntime::new(
            build_graph(&cfg).unwrap(),
            RuntimeOptions {
                exit_when_idle: true,
            },
        );

        core.step(RuntimeEvent::StartRequested);
        done(&mut core, "clean");
        core.step(RuntimeEvent::TargetCompleted {
            target: "css".to_string(),
            outcome: TargetOutcome::Failed("scss: boom".to_string()),
        });
        let mut last = CoreStep::running(Vec::new());
        for t in ["js", "images", "fonts", "icons"] {
            last = done(&mut core, t);
        }

        let report = last
            .commands
            .iter()
            .find_map(|c| match c {
                CoreCommand::PlanCompleted(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            report.outcome("html"),
            Some(&TargetOutcome::Failed("dependency 'css' failed".to_string()))
        );
        assert!(!core.is_in_flight("html"));
    }
}
