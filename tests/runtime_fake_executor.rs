// tests/runtime_fake_executor.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use sitewatch::config::ConfigFile;
use sitewatch::dag::{Scheduler, TaskRegistry};
use sitewatch::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
};
use sitewatch::errors::SitewatchError;
use sitewatch::types::BuildFailurePolicy;
use sitewatch_test_utils::builders::ConfigFileBuilder;
use sitewatch_test_utils::fake_executor::{ExecutionLog, RecordingExecutor};

type TestResult = Result<(), Box<dyn Error>>;

/// Run `target` on the dev-loop graph of `cfg` until the runtime stops.
///
/// `configure` may attach outcomes to the executor.
async fn run_target<F>(
    cfg: &ConfigFile,
    target: &str,
    configure: F,
) -> (sitewatch::errors::Result<()>, ExecutionLog)
where
    F: FnOnce(RecordingExecutor) -> RecordingExecutor,
{
    let scheduler = Scheduler::from_registry(&TaskRegistry::dev_loop(cfg)).unwrap();
    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let core = CoreRuntime::new(
        scheduler,
        cfg.config.triggered_while_running_behaviour,
        cfg.config.queue_length,
        options,
    );

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = configure(RecordingExecutor::new(rt_tx.clone()));
    let log = executor.log();

    // Seed initial manual trigger before starting the runtime loop.
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: target.to_string(),
            reason: TriggerReason::Manual,
        })
        .await
        .unwrap();

    let runtime = Runtime::new(core, rt_rx, executor);

    // Enforce an upper bound on how long this test may run.
    let result = match timeout(Duration::from_secs(3), runtime.run()).await {
        Ok(result) => result,
        Err(_) => panic!("runtime did not finish within 3 seconds"),
    };
    (result, log)
}

#[tokio::test]
async fn default_target_runs_build_reload_serve_watch_in_order() -> TestResult {
    init_tracing();

    let cfg = ConfigFile::defaults();
    let (result, log) = run_target(&cfg, "default", |e| e).await;
    result?;

    assert_eq!(
        log.names(),
        vec!["build", "reload", "serve", "watch", "default"]
    );
    // One run, one build.
    assert!(log.entries().iter().all(|(_, run_id)| *run_id == 1));
    assert_eq!(log.count("build"), 1);
    Ok(())
}

#[tokio::test]
async fn reload_target_runs_build_first() -> TestResult {
    init_tracing();

    let cfg = ConfigFile::defaults();
    let (result, log) = run_target(&cfg, "reload", |e| e).await;
    result?;

    assert_eq!(log.names(), vec!["build", "reload"]);
    Ok(())
}

#[tokio::test]
async fn failed_build_still_reloads_and_serves_by_default() -> TestResult {
    init_tracing();

    let cfg = ConfigFile::defaults();
    let (result, log) = run_target(&cfg, "serve", |e| {
        e.with_outcome("build", TaskOutcome::Failed(1))
    })
    .await;

    // Tolerated failure: the chain continues and the runtime exits cleanly.
    result?;
    assert_eq!(log.names(), vec!["build", "reload", "serve"]);
    Ok(())
}

#[tokio::test]
async fn failed_build_halts_chain_and_surfaces_exit_code() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .on_build_failure(BuildFailurePolicy::Halt)
        .build();
    let (result, log) = run_target(&cfg, "default", |e| {
        e.with_outcome("build", TaskOutcome::Failed(3))
    })
    .await;

    assert_eq!(log.names(), vec!["build"]);
    match result {
        Err(SitewatchError::TaskFailed { task, code }) => {
            assert_eq!(task, "build");
            assert_eq!(code, 3);
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn watch_alone_does_not_build() -> TestResult {
    init_tracing();

    let cfg = ConfigFile::defaults();
    let (result, log) = run_target(&cfg, "watch", |e| e).await;
    result?;

    assert_eq!(log.names(), vec!["watch"]);
    Ok(())
}

#[tokio::test]
async fn unknown_target_ends_the_runtime_without_running_anything() -> TestResult {
    init_tracing();

    let cfg = ConfigFile::defaults();
    let (result, log) = run_target(&cfg, "deploy", |e| e).await;
    result?;

    assert!(log.entries().is_empty());
    assert_eq!(log.count("build"), 0);
    Ok(())
}
