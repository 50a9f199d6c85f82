use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use sitewatch::dag::ScheduledTask;
use sitewatch::engine::{RuntimeEvent, TaskOutcome};
use sitewatch::errors::Result;
use sitewatch::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", with their run ids
/// - immediately reports `TaskCompleted` for each scheduled task, with
///   `Success` unless an outcome was configured for the task name.
pub struct RecordingExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<(String, u64)>>>,
    outcomes: HashMap<String, TaskOutcome>,
}

impl RecordingExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            executed: Arc::new(Mutex::new(Vec::new())),
            outcomes: HashMap::new(),
        }
    }

    /// Report `outcome` whenever `task` runs.
    pub fn with_outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }

    /// Shared log of executed tasks; stays readable after the executor is
    /// moved into a `Runtime`.
    pub fn log(&self) -> ExecutionLog {
        ExecutionLog {
            executed: Arc::clone(&self.executed),
        }
    }
}

impl ExecutorBackend for RecordingExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let outcomes = self.outcomes.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push((t.name.clone(), t.run_id));
                }

                let outcome = outcomes
                    .get(&t.name)
                    .copied()
                    .unwrap_or(TaskOutcome::Success);

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// Read side of a [`RecordingExecutor`].
#[derive(Clone)]
pub struct ExecutionLog {
    executed: Arc<Mutex<Vec<(String, u64)>>>,
}

impl ExecutionLog {
    /// Task names in execution order.
    pub fn names(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `(task, run_id)` pairs in execution order.
    pub fn entries(&self) -> Vec<(String, u64)> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of times `task` ran.
    pub fn count(&self, task: &str) -> usize {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == task)
            .count()
    }
}
