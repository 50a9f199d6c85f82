// src/engine/mod.rs

//! Orchestration engine for sitewatch.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the main runtime event loop that reacts to:
//!   - manual and file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Non-zero exit code, or `-1` when there was no code to report
    /// (spawn error, killed by signal, service failed to start).
    Failed(i32),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Task named on the command line.
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit as soon as the scheduler is idle with nothing queued, even when
    /// a server or watcher is up.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the CLI, watcher and executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be run (with everything it runs after).
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task's work finished with a concrete outcome.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::Runtime;
