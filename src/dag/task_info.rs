// src/dag/task_info.rs

//! Task metadata and per-run state.

use crate::dag::registry::TaskAction;
use crate::engine::TaskName;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Task is part of this run but waiting on dependencies.
    Pending,
    /// Task has been dispatched to the executor and is currently running.
    Running,
    /// Task completed successfully for this run.
    DoneSuccess,
    /// Task failed in this run (or was blocked by a failed dependency).
    DoneFailed,
}

/// Public, read-only view of a task's per-run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not currently participating in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Static task information from the graph, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub action: TaskAction,
    pub halt_on_failure: bool,
    /// Direct dependencies for this task.
    pub deps: Vec<TaskName>,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,

    /// Last run ID in which this task succeeded.
    pub last_successful_run: Option<u64>,

    /// Last run ID in which this task failed.
    pub last_failed_run: Option<u64>,

    /// Exit code of the most recent failure, if any.
    pub last_exit_code: Option<i32>,
}

impl TaskInfo {
    pub fn new(name: TaskName, action: TaskAction, halt_on_failure: bool, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            action,
            halt_on_failure,
            deps,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
            last_exit_code: None,
        }
    }

    /// Whether a dependent may treat this task as finished for the run.
    ///
    /// A failure only counts when the task does not halt on failure; the
    /// dependent then proceeds with whatever the failed task left behind.
    pub fn unblocks_dependents(&self) -> bool {
        match self.run_state {
            Some(RunState::DoneSuccess) => true,
            Some(RunState::DoneFailed) => !self.halt_on_failure,
            _ => false,
        }
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub action: TaskAction,
    /// Monotonically increasing run identifier.
    ///
    /// All tasks that belong to the same run share the same `run_id`.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            action: info.action.clone(),
            run_id,
        }
    }
}
