// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitewatch",
    version,
    about = "Build a static site, serve it with live reload, and rebuild on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run (build, reload, serve, watch, default).
    #[arg(value_name = "TASK", default_value = "default")]
    pub task: String,

    /// Path to the config file (TOML).
    ///
    /// When omitted, `Sitewatch.toml` is used if present and built-in
    /// defaults otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Override `[server].port`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Override `[server].host`.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Stop the chain when the generator exits non-zero instead of serving
    /// stale output.
    #[arg(long)]
    pub halt_on_build_failure: bool,

    /// List registered tasks and their dependencies, then exit.
    #[arg(long)]
    pub list: bool,

    /// Print the execution plan for TASK without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_defaults_to_default() {
        let args = CliArgs::parse_from(["sitewatch"]);
        assert_eq!(args.task, "default");
        assert!(args.config.is_none());
        assert!(!args.halt_on_build_failure);
    }

    #[test]
    fn positional_task_and_overrides() {
        let args = CliArgs::parse_from([
            "sitewatch",
            "watch",
            "--port",
            "4000",
            "--halt-on-build-failure",
        ]);
        assert_eq!(args.task, "watch");
        assert_eq!(args.port, Some(4000));
        assert!(args.halt_on_build_failure);
    }
}
