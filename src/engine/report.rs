// src/engine/report.rs

use std::fmt;

use crate::engine::{TargetName, TargetOutcome};
use crate::errors::PipelineError;

/// Per-target outcomes of one plan run, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    outcomes: Vec<(TargetName, TargetOutcome)>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the outcome of `target`.
    pub fn record(&mut self, target: impl Into<TargetName>, outcome: TargetOutcome) {
        let target = target.into();
        match self.outcomes.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = outcome,
            None => self.outcomes.push((target, outcome)),
        }
    }

    pub fn outcome(&self, target: &str) -> Option<&TargetOutcome> {
        self.outcomes
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, o)| o)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &TargetOutcome)> {
        self.outcomes.iter().map(|(t, o)| (t.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True if no target failed.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_success())
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_success())
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Every failed target as a `TargetFailed` error.
    pub fn failures(&self) -> Vec<PipelineError> {
        self.outcomes
            .iter()
            .filter_map(|(t, o)| match o {
                TargetOutcome::Failed(cause) => Some(PipelineError::target_failed(t.clone(), cause)),
                TargetOutcome::Success => None,
            })
            .collect()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (target, outcome) in &self.outcomes {
            match outcome {
                TargetOutcome::Success => writeln!(f, "  ok      {target}")?,
                TargetOutcome::Failed(cause) => writeln!(f, "  FAILED  {target}: {cause}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_lists_each_failed_target() {
        let mut report = BuildReport::new();
        report.record("clean", TargetOutcome::Success);
        report.record("images", TargetOutcome::Failed("images: bad.jpg: corrupt".into()));
        report.record("css", TargetOutcome::Success);

        assert!(!report.is_success());
        assert_eq!(report.succeeded(), vec!["clean", "css"]);

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        match &failures[0] {
            PipelineError::TargetFailed { target, cause } => {
                assert_eq!(target, "images");
                assert!(cause.contains("corrupt"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
