// src/exec/mod.rs

//! Task execution layer.
//!
//! Turns `ScheduledTask`s into work and reports back to the runtime with
//! `RuntimeEvent::TaskCompleted`.
//!
//! - [`executor_loop`] owns the background loop and the resident services
//!   (static server, file watcher) started by `serve` and `watch`.
//! - [`task_runner`] performs the work of one task.
//! - [`generator`] spawns the external site generator.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production. Tests swap in a fake.

pub mod backend;
pub mod executor_loop;
pub mod generator;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{spawn_executor, ExecContext};
pub use generator::run_generator;
