// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, warn};

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the process exits (nothing left to run or serve).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger event.
///
/// - Unknown targets are ignored; an idle core then applies the exit rule
///   as if a run had just finished.
/// - If the scheduler is idle, start a new run for this target.
/// - If a run is active:
///   - a target already in the run is queued for a later run;
///   - a target not in the run is merged into it immediately.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    if !scheduler.graph().contains(&task) {
        warn!(task = %task, ?reason, "trigger for unknown task; ignoring");
        let keep_running = !should_exit(scheduler, queue, options);
        if !keep_running {
            commands.push(CoreCommand::RequestExit);
        }
        return CoreStep {
            commands,
            keep_running,
        };
    }

    if scheduler.is_idle() {
        debug!(task = %task, ?reason, "idle; starting run for trigger");
        commands.extend(start_new_run(scheduler, &task));
        return CoreStep::running(commands);
    }

    match scheduler.run_state_of(&task) {
        None => {
            // Filtered out above.
        }
        Some(TaskRunState::NotInRun) => {
            let newly_ready = scheduler.handle_trigger(&task);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(_already_in_run) => {
            queue.record_trigger(&task);
        }
    }

    CoreStep::running(commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let newly_ready = scheduler.handle_completion(&task, outcome);
    if !newly_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(newly_ready));
    }

    commands.extend(maybe_start_queued_run(scheduler, queue));

    let keep_running = !should_exit(scheduler, queue, options);
    if !keep_running {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// Nothing is running or queued, and nothing resident keeps the process
/// useful (or the caller asked to exit when idle).
fn should_exit(scheduler: &Scheduler, queue: &TriggerQueue, options: &RuntimeOptions) -> bool {
    scheduler.is_idle()
        && queue.is_empty()
        && (options.exit_when_idle || !scheduler.has_resident_services())
}

/// Start a new run for one target.
///
/// An unknown target leaves the scheduler untouched.
pub fn start_new_run(scheduler: &mut Scheduler, target: &str) -> Vec<CoreCommand> {
    if !scheduler.graph().contains(target) {
        warn!(task = %target, "cannot start a run for unknown task");
        return Vec::new();
    }
    scheduler.start_new_run();

    let ready = scheduler.handle_trigger(target);
    if ready.is_empty() {
        Vec::new()
    } else {
        vec![CoreCommand::DispatchTasks(ready)]
    }
}

/// If the scheduler is idle and there are queued triggers, start the next run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    match queue.next_run() {
        Some(target) => {
            debug!(task = %target, "starting queued run");
            start_new_run(scheduler, &target)
        }
        None => Vec::new(),
    }
}
