// src/exec/task_runner.rs

//! Work performed for a single scheduled task.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::{ScheduledTask, TaskAction};
use crate::engine::{RuntimeEvent, TaskName, TaskOutcome};
use crate::exec::executor_loop::{ExecContext, Resident};
use crate::exec::generator::run_generator;
use crate::serve::start_server;
use crate::watch::spawn_watcher;

/// Run one task and report its outcome.
///
/// The generator runs in its own Tokio task so the loop stays free to start
/// other work. Serve and watch mutate `resident` and finish in place; a
/// second run of either finds the service up and succeeds without
/// restarting it.
pub async fn run_task(
    task: ScheduledTask,
    ctx: &ExecContext,
    resident: &mut Resident,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    info!(
        task = %task.name,
        run_id = task.run_id,
        action = %task.action,
        "starting task"
    );

    let outcome = match &task.action {
        TaskAction::Generate { program, args } => {
            let program = program.clone();
            let args = args.clone();
            let hub = ctx.hub.clone();
            let cwd = ctx.project_root.clone();
            let tx = runtime_tx.clone();
            let name = task.name.clone();
            let run_id = task.run_id;
            tokio::spawn(async move {
                let outcome = match run_generator(&program, &args, &cwd, &hub).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!(task = %name, run_id, error = ?err, "task execution error");
                        TaskOutcome::Failed(-1)
                    }
                };
                send_completion(&tx, name, outcome).await;
            });
            return;
        }
        TaskAction::Reload => {
            let clients = ctx.hub.reload();
            debug!(task = %task.name, clients, "reload pushed");
            TaskOutcome::Success
        }
        TaskAction::Serve => ensure_server(&task, ctx, resident).await,
        TaskAction::Watch { trigger } => ensure_watcher(&task, trigger, ctx, resident, runtime_tx),
        TaskAction::Group => TaskOutcome::Success,
    };

    report_completion(runtime_tx, task.name, outcome);
}

async fn ensure_server(task: &ScheduledTask, ctx: &ExecContext, resident: &mut Resident) -> TaskOutcome {
    if let Some(server) = &resident.server {
        debug!(task = %task.name, addr = %server.local_addr(), "server already running");
        return TaskOutcome::Success;
    }

    match start_server(ctx.server.clone(), ctx.hub.clone(), ctx.fs.clone()).await {
        Ok(handle) => {
            resident.server = Some(handle);
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, run_id = task.run_id, error = ?err, "failed to start server");
            TaskOutcome::Failed(-1)
        }
    }
}

fn ensure_watcher(
    task: &ScheduledTask,
    trigger: &str,
    ctx: &ExecContext,
    resident: &mut Resident,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> TaskOutcome {
    if resident.watcher.is_some() {
        debug!(task = %task.name, "watcher already running");
        return TaskOutcome::Success;
    }

    match spawn_watcher(
        ctx.project_root.clone(),
        ctx.filter.clone(),
        trigger,
        runtime_tx.clone(),
    ) {
        Ok(handle) => {
            resident.watcher = Some(handle);
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, run_id = task.run_id, error = ?err, "failed to start watcher");
            TaskOutcome::Failed(-1)
        }
    }
}

/// Send the completion from a separate task so the executor loop never
/// blocks on a full runtime channel while the runtime blocks on it.
fn report_completion(runtime_tx: &mpsc::Sender<RuntimeEvent>, task: TaskName, outcome: TaskOutcome) {
    let tx = runtime_tx.clone();
    tokio::spawn(async move {
        send_completion(&tx, task, outcome).await;
    });
}

async fn send_completion(tx: &mpsc::Sender<RuntimeEvent>, task: TaskName, outcome: TaskOutcome) {
    info!(task = %task, ?outcome, "task finished");
    if tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        debug!(task = %task, "runtime gone; dropping completion");
    }
}
