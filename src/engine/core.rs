// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{handle_task_completion, handle_task_trigger, CoreStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::errors::SitewatchError;
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        let queue = TriggerQueue::new(behaviour, queue_length);
        Self {
            scheduler,
            queue,
            options,
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Error to report when the runtime stops on its own: the first task of
    /// the latest run that failed with `halt_on_failure`.
    pub fn exit_error(&self) -> Option<SitewatchError> {
        self.scheduler
            .halted_failures()
            .first()
            .map(|(task, code)| SitewatchError::TaskFailed {
                task: task.clone(),
                code: *code,
            })
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, &self.options, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::dag::TaskRegistry;
    use crate::engine::{CoreCommand, TaskOutcome, TriggerReason};

    fn core() -> CoreRuntime {
        let scheduler =
            Scheduler::from_registry(&TaskRegistry::dev_loop(&ConfigFile::defaults())).unwrap();
        CoreRuntime::new(
            scheduler,
            TriggerWhileRunningBehaviour::Queue,
            4,
            RuntimeOptions::default(),
        )
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks),
                CoreCommand::RequestExit => None,
            })
            .flatten()
            .map(|t| t.name.clone())
            .collect()
    }

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        }
    }

    fn done(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome: TaskOutcome::Success,
        }
    }

    #[test]
    fn build_only_run_requests_exit() {
        let mut core = core();
        assert_eq!(dispatched(&core.step(trigger("build"))), vec!["build"]);

        let step = core.step(done("build"));
        assert!(!step.keep_running);
        assert!(matches!(step.commands.last(), Some(CoreCommand::RequestExit)));
    }

    #[test]
    fn retrigger_during_run_is_queued_then_started() {
        let mut core = core();
        core.step(trigger("watch"));
        core.step(done("watch"));
        assert!(core.is_idle());

        assert_eq!(dispatched(&core.step(trigger("reload"))), vec!["build"]);
        assert!(dispatched(&core.step(trigger("reload"))).is_empty());
        assert!(!core.queue_is_empty());

        assert_eq!(dispatched(&core.step(done("build"))), vec!["reload"]);

        // First run ends and the queued one starts at once.
        let step = core.step(done("reload"));
        assert!(step.keep_running);
        assert_eq!(dispatched(&step), vec!["build"]);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn unknown_trigger_leaves_core_idle() {
        let mut core = core();
        let step = core.step(trigger("deploy"));

        assert!(dispatched(&step).is_empty());
        assert!(core.is_idle());
        assert!(core.scheduler().current_run_id().is_none());
        // Nothing resident is up, so there is no reason to stay alive.
        assert!(!step.keep_running);

        // A known trigger afterwards starts the first run normally.
        assert_eq!(dispatched(&core.step(trigger("build"))), vec!["build"]);
        assert_eq!(core.scheduler().current_run_id(), Some(1));
    }

    #[test]
    fn unknown_trigger_during_run_is_not_queued() {
        let mut core = core();
        core.step(trigger("build"));
        let step = core.step(trigger("deploy"));
        assert!(step.keep_running);
        assert!(core.queue_is_empty());
        assert!(!core.is_idle());
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = core();
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
        assert!(core.exit_error().is_none());
    }
}
