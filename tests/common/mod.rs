#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sitewatch::engine::{CoreCommand, CoreStep, RuntimeEvent, TaskOutcome, TriggerReason};

pub use sitewatch_test_utils::{init_tracing, with_timeout};

pub fn trigger(task: &str, reason: TriggerReason) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason,
    }
}

pub fn completed(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome,
    }
}

/// Names of all tasks dispatched by a core step.
pub fn dispatched(step: &CoreStep) -> Vec<String> {
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

pub fn requests_exit(step: &CoreStep) -> bool {
    step.commands
        .iter()
        .any(|c| matches!(c, CoreCommand::RequestExit))
}

/// Write a shell script that appends its arguments to `args.log` in `dir`
/// and exits with `code`. Returns the script path; run it via `sh`.
pub fn write_fake_generator(dir: &Path, code: i32) -> PathBuf {
    let script = dir.join("fake-generator.sh");
    let log = dir.join("args.log");
    std::fs::write(
        &script,
        format!("echo \"$@\" >> '{}'\nexit {code}\n", log.display()),
    )
    .unwrap();
    script
}
