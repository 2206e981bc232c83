// src/watch/event_handler.rs

//! Turns notify events into target triggers.

use std::path::Path;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TargetName, TriggerReason};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBindings;

/// Reads and metadata-only access never change outputs.
pub fn is_relevant(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

/// Targets affected by `event`, deduplicated, in first-match order.
pub fn targets_for_event(root: &Path, event: &Event, bindings: &WatchBindings) -> Vec<TargetName> {
    if !is_relevant(&event.kind) {
        return Vec::new();
    }

    let mut targets: Vec<TargetName> = Vec::new();
    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            debug!(?path, "event path outside the project root; ignoring");
            continue;
        };
        for target in bindings.targets_for(&rel) {
            if !targets.contains(&target) {
                debug!(path = %rel, target = %target, "watch match");
                targets.push(target);
            }
        }
    }
    targets
}

/// Forward the triggers for one event to the runtime. Returns `false` once
/// the runtime channel is closed.
pub async fn process_event(
    root: &Path,
    event: Event,
    bindings: &WatchBindings,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    for target in targets_for_event(root, &event, bindings) {
        let sent = runtime_tx
            .send(RuntimeEvent::TargetTriggered {
                target,
                reason: TriggerReason::FileWatch,
            })
            .await;
        if let Err(err) = sent {
            warn!("failed to send RuntimeEvent::TargetTriggered: {err}");
            return false;
        }
    }
    true
}
