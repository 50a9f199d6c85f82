// src/dag/registry.rs

//! Declaration of named tasks.
//!
//! A task is a name, the tasks it runs after, and the work it performs.
//! Dependencies can be declared two ways that end up in the same graph:
//!
//! - [`TaskRegistry::register`]: array style, every dependency may start as
//!   soon as its own dependencies allow.
//! - [`TaskRegistry::register_series`]: explicit composition, each part
//!   starts only after the previous part finished.

use std::fmt;

use crate::config::ConfigFile;
use crate::engine::TaskName;

pub const BUILD_TASK: &str = "build";
pub const RELOAD_TASK: &str = "reload";
pub const SERVE_TASK: &str = "serve";
pub const WATCH_TASK: &str = "watch";
pub const DEFAULT_TASK: &str = "default";

/// The work bound to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Spawn the site generator and wait for it to exit.
    Generate { program: String, args: Vec<String> },
    /// Tell connected browsers to refresh.
    Reload,
    /// Start the static server. Stays up after the task completes.
    Serve,
    /// Register the filesystem watcher. On change it triggers `trigger`.
    Watch { trigger: TaskName },
    /// No work of its own.
    Group,
}

impl TaskAction {
    /// Whether the action leaves a service running after completion.
    pub fn is_resident(&self) -> bool {
        matches!(self, TaskAction::Serve | TaskAction::Watch { .. })
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Generate { program, args } => {
                write!(f, "run `{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, "`")
            }
            TaskAction::Reload => write!(f, "reload browsers"),
            TaskAction::Serve => write!(f, "serve output"),
            TaskAction::Watch { trigger } => write!(f, "watch files -> {trigger}"),
            TaskAction::Group => write!(f, "group"),
        }
    }
}

/// How a task's dependencies are ordered relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composition {
    #[default]
    Parallel,
    Series,
}

/// A single registered task.
#[derive(Debug, Clone)]
pub struct TaskDef {
    pub name: TaskName,
    pub after: Vec<TaskName>,
    pub composition: Composition,
    pub action: TaskAction,
    /// If the task fails, fail its dependents for the run instead of
    /// letting them proceed.
    pub halt_on_failure: bool,
}

/// Ordered set of task declarations. Validation happens when the registry
/// is turned into a [`DagGraph`](crate::dag::DagGraph).
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<TaskDef>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` to run `action` after every task in `after`.
    ///
    /// Registering an existing name replaces the earlier declaration.
    pub fn register<N, I, S>(&mut self, name: N, after: I, action: TaskAction) -> &mut TaskDef
    where
        N: Into<TaskName>,
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.insert(TaskDef {
            name: name.into(),
            after: after.into_iter().map(Into::into).collect(),
            composition: Composition::Parallel,
            action,
            halt_on_failure: true,
        })
    }

    /// Register `name` to run `parts` one after another, then `action`.
    pub fn register_series<N, I, S>(&mut self, name: N, parts: I, action: TaskAction) -> &mut TaskDef
    where
        N: Into<TaskName>,
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.insert(TaskDef {
            name: name.into(),
            after: parts.into_iter().map(Into::into).collect(),
            composition: Composition::Series,
            action,
            halt_on_failure: true,
        })
    }

    fn insert(&mut self, def: TaskDef) -> &mut TaskDef {
        let idx = match self.tasks.iter().position(|t| t.name == def.name) {
            Some(idx) => {
                self.tasks[idx] = def;
                idx
            }
            None => {
                self.tasks.push(def);
                self.tasks.len() - 1
            }
        };
        &mut self.tasks[idx]
    }

    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDef> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The standard development loop:
    ///
    /// ```text
    /// build -> reload -> serve
    /// watch (triggers reload, which pulls in build)
    /// default = series(serve, watch)
    /// ```
    pub fn dev_loop(cfg: &ConfigFile) -> Self {
        let mut registry = Self::new();

        registry
            .register(
                BUILD_TASK,
                Vec::<TaskName>::new(),
                TaskAction::Generate {
                    program: cfg.generator.program.clone(),
                    args: cfg.generator.args.clone(),
                },
            )
            .halt_on_failure = cfg.config.on_build_failure.halts();

        registry.register(RELOAD_TASK, [BUILD_TASK], TaskAction::Reload);
        registry.register(SERVE_TASK, [RELOAD_TASK], TaskAction::Serve);
        registry.register(
            WATCH_TASK,
            Vec::<TaskName>::new(),
            TaskAction::Watch {
                trigger: RELOAD_TASK.to_string(),
            },
        );
        registry.register_series(DEFAULT_TASK, [SERVE_TASK, WATCH_TASK], TaskAction::Group);

        registry
    }
}
