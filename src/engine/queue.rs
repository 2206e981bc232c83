// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::debug;

use super::TargetName;

/// Follow-up runs requested while a target was busy.
///
/// Semantics:
/// - Each target appears at most once: any number of triggers that arrive
///   while a target is in flight collapse into a single follow-up run.
/// - Order is first-trigger order, so drained follow-ups dispatch
///   deterministically.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: VecDeque<TargetName>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no queued follow-ups.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.pending.iter().any(|t| t == target)
    }

    /// Record a trigger for a busy target. Returns false if a follow-up was
    /// already queued (the trigger was coalesced).
    pub fn record_trigger(&mut self, target: &str) -> bool {
        if self.contains(target) {
            debug!(target = %target, "trigger coalesced into queued follow-up");
            return false;
        }
        self.pending.push_back(target.to_string());
        debug!(target = %target, queued = self.pending.len(), "queued follow-up run");
        true
    }

    /// Remove the queued follow-up for `target`, if any.
    pub fn take(&mut self, target: &str) -> bool {
        match self.pending.iter().position(|t| t == target) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Take every queued follow-up, in first-trigger order.
    pub fn drain_pending(&mut self) -> Vec<TargetName> {
        self.pending.drain(..).collect()
    }

    /// Snapshot of the queued targets (for diagnostics and tests).
    pub fn pending(&self) -> Vec<TargetName> {
        self.pending.iter().cloned().collect()
    }
}
