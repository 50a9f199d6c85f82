// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::registry::Composition;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::DagGraph;
use crate::engine::TaskName;

/// Extra "waits for" edges that only hold within the current run.
///
/// Series composition adds these: with `default = series(serve, watch)`,
/// `watch` waits for `serve` only in runs that include `default`.
pub type RunOrder = HashMap<TaskName, Vec<TaskName>>;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    run_order: &'a mut RunOrder,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        run_order: &'a mut RunOrder,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            run_order,
            current_run_id,
        }
    }

    /// Include a target and everything it runs after in this run.
    ///
    /// - Tasks that were not yet part of the run (`run_state == None`) are
    ///   marked `Pending`.
    /// - Tasks already participating in this run keep their current state.
    /// - Series composition on any visited task adds run-scoped ordering
    ///   between its parts.
    pub fn mark_target_and_upstream_pending(&mut self, target: &str) {
        let mut stack: Vec<TaskName> = vec![target.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "node in DAG not present in tasks map");
                continue;
            };

            if info.run_state.is_none() {
                info.run_state = Some(RunState::Pending);
                debug!(task = %info.name, "marked Pending for this run");
            }

            let deps = self.graph.dependencies_of(&name);
            if self.graph.composition_of(&name) == Some(Composition::Series) {
                for pair in deps.windows(2) {
                    let waits = self.run_order.entry(pair[1].clone()).or_default();
                    if !waits.contains(&pair[0]) {
                        waits.push(pair[0].clone());
                    }
                }
            }
            stack.extend(deps.iter().cloned());
        }
    }

    /// Determine whether all dependencies of the given task are satisfied for
    /// the *current run*.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        let ro = ReadOnlyStateManager::new(self.tasks, self.run_order);
        ro.deps_satisfied_for_info(info)
    }

    /// Mark every pending/running task downstream of `failed_task` as
    /// `DoneFailed` for this run, following both dependency edges and
    /// run-scoped series ordering.
    ///
    /// Returns the list of tasks that were newly marked as failed (excluding
    /// the root task; the caller adds that separately).
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.downstream_of(failed_task);
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            match info.run_state {
                Some(RunState::Pending) | Some(RunState::Running) => {
                    info.run_state = Some(RunState::DoneFailed);
                    debug!(
                        task = %info.name,
                        upstream = %failed_task,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    newly_failed.push(info.name.clone());
                    stack.extend(self.downstream_of(&name));
                }
                Some(RunState::DoneSuccess) | Some(RunState::DoneFailed) | None => {
                    // Either already terminal or not participating in this run.
                }
            }
        }

        newly_failed
    }

    fn downstream_of(&self, name: &str) -> Vec<TaskName> {
        let mut out: Vec<TaskName> = self.graph.dependents_of(name).to_vec();
        for (waiter, waits_for) in self.run_order.iter() {
            if waits_for.iter().any(|w| w == name) && !out.contains(waiter) {
                out.push(waiter.clone());
            }
        }
        out
    }

    /// Collect tasks that are `Pending` and whose dependencies are satisfied,
    /// mark them as `Running`, and return them as `ScheduledTask`s in
    /// declaration order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut ready = Vec::new();

        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<TaskName> = self
            .graph
            .tasks()
            .filter_map(|name| self.tasks.get(name))
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending))
                    && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();

        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();

                if is_rerun {
                    info!(
                        task = %info.name,
                        run_id = self.current_run_id,
                        "starting task again"
                    );
                } else {
                    info!(
                        task = %info.name,
                        run_id = self.current_run_id,
                        "starting task"
                    );
                }

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// A read-only view of the state manager for checking dependency satisfaction.
///
/// This is used when we only have shared access to the tasks map (e.g. in `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
    run_order: &'a RunOrder,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>, run_order: &'a RunOrder) -> Self {
        Self { tasks, run_order }
    }

    /// Determine whether all dependencies (and run-scoped predecessors) of the
    /// given task are satisfied for the *current run*.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        let extra = self
            .run_order
            .get(&info.name)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        for dep_name in info.deps.iter().chain(extra.iter()) {
            let Some(dep) = self.tasks.get(dep_name) else {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                return false;
            };

            match dep.run_state {
                Some(_) => {
                    if !dep.unblocks_dependents() {
                        return false;
                    }
                }
                None => {
                    // Not part of this run; rely on history.
                    if dep.last_successful_run.is_none() {
                        return false;
                    }
                }
            }
        }

        true
    }
}
