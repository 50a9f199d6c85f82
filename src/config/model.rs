// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{BuildFailurePolicy, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// triggered_while_running_behaviour = "queue"
/// queue_length = 1
/// on_build_failure = "continue"
///
/// [generator]
/// program = "jekyll"
/// args = ["build"]
///
/// [server]
/// root = "_site"
/// port = 3000
///
/// [watch]
/// include = ["**/*"]
/// ```
///
/// All sections are optional; an empty file reproduces the classic
/// `jekyll build` + `_site` setup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub generator: GeneratorSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can rely on the checked invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub generator: GeneratorSection,
    pub server: ServerSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            generator: raw.generator,
            server: raw.server,
            watch: raw.watch,
        }
    }

    /// Built-in defaults (what an empty config file yields).
    pub fn defaults() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }

    /// Human-readable generator invocation, e.g. `jekyll build`.
    pub fn generator_display(&self) -> String {
        self.generator.display()
    }
}

/// `[config]` section: runner behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued re-runs to remember while a run is active.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// `"continue"` (default) or `"halt"`.
    #[serde(default)]
    pub on_build_failure: BuildFailurePolicy,
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            on_build_failure: BuildFailurePolicy::default(),
        }
    }
}

/// `[generator]` section: the external site generator.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "jekyll".to_string()
}

fn default_args() -> Vec<String> {
    vec!["build".to_string()]
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
        }
    }
}

impl GeneratorSection {
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// `[server]` section: static server rooted at the generator output.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Output directory of the generator, relative to the project root.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    /// `0` asks the OS for an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Inject the reload client into served HTML pages.
    #[serde(default = "default_true")]
    pub live_reload: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from("_site")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            host: default_host(),
            port: default_port(),
            live_reload: true,
        }
    }
}

/// `[watch]` section.
///
/// The output directory is always excluded on top of `exclude`.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

fn default_exclude() -> Vec<String> {
    [".git/**", ".jekyll-cache/**", ".jekyll-metadata", ".sass-cache/**"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
        }
    }
}
