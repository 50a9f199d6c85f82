// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive for a task already taking part in the active run.
///
/// Semantics:
/// - `Queue`: every trigger becomes its own future run, so N change events
///   yield N rebuilds. `max_runs` bounds how many are remembered; past that
///   the oldest are dropped.
/// - `Cancel`: only the latest trigger is kept.
///
/// Nothing here interrupts the run that is already executing.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<TaskName>,
}

impl TriggerQueue {
    /// Create a new queue with the given behaviour and maximum queued runs.
    ///
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Record that a task was triggered while a run is in progress.
    pub fn record_trigger(&mut self, task: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                self.runs.push_back(task.to_string());
                debug!(task = %task, queued = self.runs.len(), "queued trigger for a later run");

                if self.runs.len() > self.max_runs {
                    warn!(
                        queued = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping oldest queued triggers"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(task = %task, "keeping only the latest trigger (cancel mode)");
                self.runs.clear();
                self.runs.push_back(task.to_string());
            }
        }
    }

    /// Take the oldest queued trigger, if any.
    pub fn next_run(&mut self) -> Option<TaskName> {
        self.runs.pop_front()
    }
}
