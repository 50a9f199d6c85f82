use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::registry::TaskRegistry;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, RunOrder, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::Result;

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a task is "ready" to run (deps satisfied)
/// - marking tasks as succeeded/failed
/// - scheduling dependents when appropriate
/// - failing dependents when a halting task fails
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    run_order: RunOrder,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
    /// Halting failures of the most recent finished (or current) run.
    halted: Vec<(TaskName, i32)>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`DagGraph`].
    pub fn new(graph: DagGraph) -> Self {
        let mut tasks = HashMap::new();

        for name in graph.tasks() {
            let Some(action) = graph.action_of(name) else {
                continue;
            };
            let info = TaskInfo::new(
                name.to_string(),
                action.clone(),
                graph.halts_on_failure(name),
                graph.dependencies_of(name).to_vec(),
            );
            tasks.insert(name.to_string(), info);
        }

        Self {
            graph,
            tasks,
            run_order: RunOrder::new(),
            run_counter: 0,
            current_run_id: None,
            halted: Vec::new(),
        }
    }

    /// Validate a registry and build a scheduler over it.
    pub fn from_registry(registry: &TaskRegistry) -> Result<Self> {
        Ok(Self::new(DagGraph::from_registry(registry)?))
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Exit code of the task's most recent failure, if it has failed before.
    pub fn last_exit_code_of(&self, task: &str) -> Option<i32> {
        self.tasks.get(task)?.last_exit_code
    }

    /// Whether the dependencies of `task` are satisfied for the *current run*.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks, &self.run_order);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Whether a serve or watch task has come up at least once. Those keep
    /// running after their task completes, so the process has work to do
    /// even when the scheduler is idle.
    pub fn has_resident_services(&self) -> bool {
        self.tasks
            .values()
            .any(|info| info.action.is_resident() && info.last_successful_run.is_some())
    }

    /// Halting failures (task, exit code) recorded in the latest run.
    pub fn halted_failures(&self) -> &[(TaskName, i32)] {
        &self.halted
    }

    /// Start a new run, resetting per-run state but keeping historical
    /// success information.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.run_order.clear();
        self.halted.clear();

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Handle a trigger for a target task (production API).
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task).newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_trigger` that returns a rich [`SchedulerStep`].
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        self.trigger_step_internal(task)
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Task names in declaration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Determine whether all tasks are in a terminal state and clear
    /// `current_run_id` if so.
    ///
    /// Returns `true` if this call transitioned the scheduler from running
    /// to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(
            &self.graph,
            &mut self.tasks,
            &mut self.run_order,
            self.current_run_id,
        );

        if manager.all_tasks_terminal() {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tasks terminal; run finished"
            );
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        if !self.tasks.contains_key(task) {
            warn!(task = %task, "trigger for unknown task; ignoring");
            return SchedulerStep::default();
        }

        if self.current_run_id.is_none() {
            debug!(
                task = %task,
                "handle_trigger called with no active run; implicitly starting a new run"
            );
            self.start_new_run();
        }

        let mut manager = StateManager::new(
            &self.graph,
            &mut self.tasks,
            &mut self.run_order,
            self.current_run_id,
        );
        manager.mark_target_and_upstream_pending(task);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let run_id = match self.current_run_id {
            Some(id) => id,
            None => {
                warn!(
                    task = %task,
                    "handle_completion called with no active run; ignoring"
                );
                return SchedulerStep::default();
            }
        };

        let mut newly_scheduled = Vec::new();
        let mut newly_failed = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    let mut manager = StateManager::new(
                        &self.graph,
                        &mut self.tasks,
                        &mut self.run_order,
                        self.current_run_id,
                    );
                    newly_scheduled.extend(manager.collect_new_ready_tasks());
                }
                TaskOutcome::Failed(code) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    info.last_exit_code = Some(code);
                    newly_failed.push(info.name.clone());

                    if info.halt_on_failure {
                        warn!(
                            task = %info.name,
                            run_id,
                            exit_code = code,
                            "task failed; failing dependents in this run"
                        );
                        self.halted.push((info.name.clone(), code));
                        let mut manager = StateManager::new(
                            &self.graph,
                            &mut self.tasks,
                            &mut self.run_order,
                            self.current_run_id,
                        );
                        newly_failed.append(&mut manager.mark_dependents_failed(task));
                    } else {
                        warn!(
                            task = %info.name,
                            run_id,
                            exit_code = code,
                            "task failed; dependents continue with previous output"
                        );
                        let mut manager = StateManager::new(
                            &self.graph,
                            &mut self.tasks,
                            &mut self.run_order,
                            self.current_run_id,
                        );
                        newly_scheduled.extend(manager.collect_new_ready_tasks());
                    }
                }
            },
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }
}
