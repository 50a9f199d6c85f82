// src/serve/mod.rs

//! Static file server with live reload.
//!
//! - [`hub`] fans reload/notify messages out to connected browsers.
//! - [`files`] maps request paths onto the output directory.
//! - [`inject`] adds the reload client to served HTML.
//! - [`http`] is the minimal HTTP/1.1 request/response layer.
//! - [`server`] owns the listener and its start/stop lifecycle.

pub mod files;
pub mod http;
pub mod hub;
pub mod inject;
pub mod server;

pub use hub::{ReloadHub, ReloadMessage};
pub use server::{start_server, ServerConfig, ServerHandle};

/// Path of the Server-Sent-Events endpoint the injected client listens on.
pub const EVENTS_PATH: &str = "/__sitewatch/events";
