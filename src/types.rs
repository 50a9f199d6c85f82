use std::str::FromStr;
use serde::Deserialize;

/// Behaviour when a new trigger arrives while a run is already in progress.
///
/// - `Queue`: remember the trigger and start a new run for it when the
///   current one finishes (default behaviour).
/// - `Cancel`: drop any previously queued triggers and only keep the latest.
///   The running chain itself is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// What happens to the rest of the chain when the generator exits non-zero.
///
/// The exit status is always reported; this only decides whether
/// dependents (reload, serve) still run against the previous output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFailurePolicy {
    /// Keep going and serve whatever the output directory holds.
    #[default]
    Continue,
    /// Fail every dependent of the build for this run.
    Halt,
}

impl BuildFailurePolicy {
    pub fn halts(self) -> bool {
        matches!(self, BuildFailurePolicy::Halt)
    }
}
