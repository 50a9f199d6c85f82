// src/exec/executor_loop.rs

//! Background executor loop and the resident services it owns.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::config::ConfigFile;
use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::task_runner::run_task;
use crate::fs::FileSystem;
use crate::serve::{ReloadHub, ServerConfig, ServerHandle};
use crate::watch::{WatchFilter, WatcherHandle};

/// Everything task actions need from the outside world.
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Directory the generator runs in and the watcher watches.
    pub project_root: PathBuf,
    pub server: ServerConfig,
    pub filter: WatchFilter,
    pub hub: ReloadHub,
    pub fs: Arc<dyn FileSystem>,
}

impl ExecContext {
    /// Context for `cfg` rooted at `project_root`.
    pub fn from_config(
        cfg: &ConfigFile,
        project_root: PathBuf,
        hub: ReloadHub,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let server = ServerConfig::from_section(&cfg.server, &project_root);
        let filter = WatchFilter::from_config(cfg)?;
        Ok(Self {
            project_root,
            server,
            filter,
            hub,
            fs,
        })
    }
}

/// Services that outlive the task that started them.
///
/// Dropped together with the executor loop, which stops the server and the
/// watcher.
#[derive(Debug, Default)]
pub struct Resident {
    pub server: Option<ServerHandle>,
    pub watcher: Option<WatcherHandle>,
}

/// Spawn the background executor loop.
///
/// The returned sender is what `RealExecutorBackend` dispatches on. The loop
/// ends when every sender is dropped, taking the resident services with it.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: ExecContext,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut resident = Resident::default();

        while let Some(task) = rx.recv().await {
            run_task(task, &ctx, &mut resident, &runtime_tx).await;
        }

        if let Some(server) = resident.server.take() {
            server.stop().await;
        }
        if let Some(watcher) = resident.watcher.take() {
            watcher.stop().await;
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
