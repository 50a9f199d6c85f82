// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the `include` / `exclude` glob patterns, with the generator
//!   output directory always excluded.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning matching change events into task triggers.
//!
//! It does **not** know about the DAG; it only names the task to trigger.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::process_change_event;
pub use patterns::WatchFilter;
pub use watcher::{spawn_watcher, WatcherHandle};
