// tests/change_events.rs

//! File change events flowing through the watch filter into the core.

mod common;
use crate::common::{completed, dispatched, init_tracing, requests_exit, trigger};

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc;

use sitewatch::config::ConfigFile;
use sitewatch::dag::{Scheduler, TaskRegistry, TaskRunState};
use sitewatch::engine::{
    CoreRuntime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use sitewatch::watch::{process_change_event, WatchFilter};

fn root() -> PathBuf {
    PathBuf::from("/project")
}

fn modify(path: &Path) -> Event {
    Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.to_path_buf())
}

fn core(behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> CoreRuntime {
    let scheduler =
        Scheduler::from_registry(&TaskRegistry::dev_loop(&ConfigFile::defaults())).unwrap();
    CoreRuntime::new(scheduler, behaviour, queue_length, RuntimeOptions::default())
}

#[tokio::test]
async fn n_idle_change_events_produce_n_build_reload_chains() {
    init_tracing();

    let filter = WatchFilter::from_config(&ConfigFile::defaults()).unwrap();
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);
    let mut core = core(TriggerWhileRunningBehaviour::Queue, 1);

    const N: usize = 4;
    let mut chains = Vec::new();

    for i in 0..N {
        let path = root().join(format!("_posts/post-{i}.md"));
        assert!(process_change_event(&root(), &modify(&path), &filter, "reload", &tx).await);

        let event = rx.try_recv().unwrap();
        let mut order = dispatched(&core.step(event));
        order.extend(dispatched(&core.step(completed("build", TaskOutcome::Success))));
        core.step(completed("reload", TaskOutcome::Success));

        assert!(core.is_idle());
        chains.push(order);
    }

    assert_eq!(chains.len(), N);
    for chain in chains {
        assert_eq!(chain, vec!["build", "reload"]);
    }
}

#[tokio::test]
async fn output_directory_changes_never_trigger() {
    init_tracing();

    let filter = WatchFilter::from_config(&ConfigFile::defaults()).unwrap();
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);

    let inside = Event::new(EventKind::Create(CreateKind::File))
        .add_path(root().join("_site/index.html"))
        .add_path(root().join("_site/feed.xml"));
    assert!(!process_change_event(&root(), &inside, &filter, "reload", &tx).await);

    let cache = modify(&root().join(".jekyll-cache/Jekyll/Cache/x"));
    assert!(!process_change_event(&root(), &cache, &filter, "reload", &tx).await);

    assert!(rx.try_recv().is_err());

    // One event touching both sides counts once.
    let mixed = modify(&root().join("_site/index.html")).add_path(root().join("index.html"));
    assert!(process_change_event(&root(), &mixed, &filter, "reload", &tx).await);
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn access_events_are_ignored() {
    let filter = WatchFilter::from_config(&ConfigFile::defaults()).unwrap();
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);

    let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
        .add_path(root().join("index.html"));
    assert!(!process_change_event(&root(), &event, &filter, "reload", &tx).await);
    assert!(rx.try_recv().is_err());
}

#[test]
fn change_during_build_runs_one_more_chain() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, 1);

    let first = core.step(trigger("reload", TriggerReason::FileWatch));
    assert_eq!(dispatched(&first), vec!["build"]);

    // Two more edits land while the build is running; queue_length = 1
    // keeps only one follow-up run.
    assert!(dispatched(&core.step(trigger("reload", TriggerReason::FileWatch))).is_empty());
    assert!(dispatched(&core.step(trigger("reload", TriggerReason::FileWatch))).is_empty());

    assert_eq!(
        dispatched(&core.step(completed("build", TaskOutcome::Success))),
        vec!["reload"]
    );
    let next = core.step(completed("reload", TaskOutcome::Success));
    assert_eq!(dispatched(&next), vec!["build"]);
    assert!(!requests_exit(&next));
    assert_eq!(
        core.scheduler().run_state_of("build"),
        Some(TaskRunState::Running)
    );

    core.step(completed("build", TaskOutcome::Success));
    let last = core.step(completed("reload", TaskOutcome::Success));
    assert!(dispatched(&last).is_empty());
    // Nothing resident was started, so the drained queue ends the process.
    assert!(requests_exit(&last));
    assert!(core.is_idle());
    assert!(core.queue_is_empty());
}

#[test]
fn reload_never_dispatched_before_build_completes() {
    let mut core = core(TriggerWhileRunningBehaviour::Cancel, 1);

    let step = core.step(trigger("reload", TriggerReason::Manual));
    assert_eq!(dispatched(&step), vec!["build"]);
    assert_eq!(
        core.scheduler().run_state_of("reload"),
        Some(TaskRunState::Pending)
    );

    let step = core.step(completed("build", TaskOutcome::Failed(2)));
    assert_eq!(dispatched(&step), vec!["reload"]);
    assert_eq!(core.scheduler().last_exit_code_of("build"), Some(2));
    assert_eq!(
        core.scheduler().run_state_of("build"),
        Some(TaskRunState::DoneFailed)
    );
}
