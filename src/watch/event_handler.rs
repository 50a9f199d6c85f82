// src/watch/event_handler.rs

//! Event processing logic for file system changes.

use std::path::Path;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchFilter;

/// Process a single notify event and trigger `trigger` if it touches a
/// watched path.
///
/// One event produces at most one trigger, however many of its paths match.
/// There is no debouncing: every matching event is forwarded.
///
/// Returns `true` if a trigger was sent.
pub async fn process_change_event(
    root: &Path,
    event: &Event,
    filter: &WatchFilter,
    trigger: &str,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }

    let matched = event.paths.iter().find_map(|path| {
        let rel = match relative_str(root, path) {
            Some(rel) => rel,
            None => {
                debug!(?path, ?root, "could not relativize event path; ignoring");
                return None;
            }
        };
        filter.matches(&rel).then_some(rel)
    });

    let Some(rel) = matched else {
        return false;
    };

    debug!(path = %rel, task = %trigger, kind = ?event.kind, "watch match -> triggering task");

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskTriggered {
            task: trigger.to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await
    {
        warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
        return false;
    }

    true
}
