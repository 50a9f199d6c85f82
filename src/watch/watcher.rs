// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName};
use crate::watch::event_handler::process_change_event;
use crate::watch::patterns::WatchFilter;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle (or
/// calling [`WatcherHandle::stop`]) ends watching.
pub struct WatcherHandle {
    root: PathBuf,
    inner: Option<RecommendedWatcher>,
    forwarder: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Stop watching and wait for the forwarding task to drain.
    pub async fn stop(mut self) {
        // Dropping the notify watcher closes the event channel, which ends
        // the forwarding loop.
        self.inner.take();
        if let Some(forwarder) = self.forwarder.take() {
            if let Err(err) = forwarder.await {
                warn!(error = %err, "watcher forwarding task ended abnormally");
            }
        }
        info!(root = ?self.root, "file watcher stopped");
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(forwarder) = &self.forwarder {
            forwarder.abort();
        }
    }
}

/// Watch `root` recursively and send `RuntimeEvent::TaskTriggered` for
/// `trigger` on every event that touches a path accepted by `filter`.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    filter: WatchFilter,
    trigger: impl Into<TaskName>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or(root);
    let trigger = trigger.into();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Fails only once the forwarding loop is gone.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .context("creating filesystem watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!(
        root = ?root,
        output = %filter.output_root(),
        task = %trigger,
        "file watcher started"
    );

    let loop_root = root.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            process_change_event(&loop_root, &event, &filter, &trigger, &runtime_tx).await;
            if runtime_tx.is_closed() {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        root,
        inner: Some(watcher),
        forwarder: Some(forwarder),
    })
}
