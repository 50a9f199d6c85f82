use std::path::PathBuf;

use sitewatch::config::{ConfigFile, RawConfigFile};
use sitewatch::dag::{TaskAction, TaskRegistry};
use sitewatch::types::{BuildFailurePolicy, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults; `build()` runs full validation.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    include_set: bool,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
            include_set: false,
        }
    }

    pub fn behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn on_build_failure(mut self, policy: BuildFailurePolicy) -> Self {
        self.config.config.on_build_failure = policy;
        self
    }

    pub fn generator(mut self, program: &str, args: &[&str]) -> Self {
        self.config.generator.program = program.to_string();
        self.config.generator.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn output_root(mut self, root: &str) -> Self {
        self.config.server.root = PathBuf::from(root);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn live_reload(mut self, enabled: bool) -> Self {
        self.config.server.live_reload = enabled;
        self
    }

    /// The first call replaces the default include list; later calls add.
    pub fn include(mut self, pattern: &str) -> Self {
        if !self.include_set {
            self.config.watch.include.clear();
            self.include_set = true;
        }
        self.config.watch.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    /// The raw config, for tests that exercise validation failures.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for ad-hoc task graphs made of `Group` tasks.
///
/// Useful when a test cares about ordering only, not about what the
/// tasks do.
pub struct TaskRegistryBuilder {
    registry: TaskRegistry,
}

impl TaskRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
        }
    }

    pub fn task(mut self, name: &str, after: &[&str]) -> Self {
        self.registry
            .register(name, after.iter().copied(), TaskAction::Group);
        self
    }

    pub fn series(mut self, name: &str, parts: &[&str]) -> Self {
        self.registry
            .register_series(name, parts.iter().copied(), TaskAction::Group);
        self
    }

    /// A task that, when it fails, does not block its dependents.
    pub fn tolerant_task(mut self, name: &str, after: &[&str]) -> Self {
        self.registry
            .register(name, after.iter().copied(), TaskAction::Group)
            .halt_on_failure = false;
        self
    }

    pub fn build(self) -> TaskRegistry {
        self.registry
    }
}

impl Default for TaskRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
