// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod serve;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::dag::{Composition, DagGraph, Scheduler, TaskRegistry};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::errors::SitewatchError;
use crate::exec::{ExecContext, RealExecutorBackend};
use crate::fs::RealFileSystem;
use crate::serve::ReloadHub;
use crate::types::BuildFailurePolicy;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - task registry, scheduler and runtime
/// - executor with the reload hub, server and watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_deref().map(Path::new);
    let mut cfg = load_or_default(config_path)?;
    apply_overrides(&mut cfg, &args);

    let registry = TaskRegistry::dev_loop(&cfg);
    let graph = DagGraph::from_registry(&registry)?;

    if args.list {
        print_task_list(&registry);
        return Ok(());
    }

    if !graph.contains(&args.task) {
        return Err(SitewatchError::TaskNotFound(args.task.clone()).into());
    }

    if args.dry_run {
        print_dry_run(&cfg, &graph, &args.task)?;
        return Ok(());
    }

    let scheduler = Scheduler::new(graph);
    let behaviour = cfg.config.triggered_while_running_behaviour;
    let queue_length = cfg.config.queue_length;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let project_root = project_root_dir(config_path);
    let ctx = ExecContext::from_config(
        &cfg,
        project_root,
        ReloadHub::new(),
        Arc::new(RealFileSystem),
    )?;
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(task = %args.task, generator = %cfg.generator_display(), "starting");
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: args.task.clone(),
            reason: TriggerReason::Manual,
        })
        .await?;

    let core = CoreRuntime::new(scheduler, behaviour, queue_length, RuntimeOptions::default());
    let runtime = Runtime::new(core, rt_rx, executor);
    runtime.run().await?;
    Ok(())
}

/// Apply `--port`, `--host` and `--halt-on-build-failure` on top of the
/// loaded configuration.
pub fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if let Some(host) = &args.host {
        cfg.server.host = host.clone();
    }
    if args.halt_on_build_failure {
        cfg.config.on_build_failure = BuildFailurePolicy::Halt;
    }
}

/// Directory the generator runs in and the watcher watches.
///
/// - With an explicit config path that has a parent (e.g.
///   "site/Sitewatch.toml"), that directory.
/// - Otherwise the current working directory.
fn project_root_dir(config_path: Option<&Path>) -> PathBuf {
    match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_task_list(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for task in registry.iter() {
        println!("  - {}: {}", task.name, task.action);
        if !task.after.is_empty() {
            let kind = match task.composition {
                Composition::Parallel => "after",
                Composition::Series => "series",
            };
            println!("      {kind}: {:?}", task.after);
        }
    }
}

/// Print the configuration summary and the order `task` would run in.
fn print_dry_run(cfg: &ConfigFile, graph: &DagGraph, task: &str) -> Result<()> {
    let plan = graph.plan(task)?;

    println!("sitewatch dry-run");
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!("  config.on_build_failure = {:?}", cfg.config.on_build_failure);
    println!("  generator = {}", cfg.generator_display());
    println!(
        "  server = http://{}:{}/ (root {:?}, live_reload {})",
        cfg.server.host, cfg.server.port, cfg.server.root, cfg.server.live_reload
    );
    println!();

    println!("plan for '{task}':");
    for (idx, name) in plan.iter().enumerate() {
        match graph.action_of(name) {
            Some(action) => println!("  {}. {name} ({action})", idx + 1),
            None => println!("  {}. {name}", idx + 1),
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
