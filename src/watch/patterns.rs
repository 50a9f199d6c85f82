// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;

/// Compiled include/exclude patterns for the project tree.
///
/// Paths passed to [`WatchFilter::matches`] are relative to the project
/// root with forward slashes, e.g. `"_posts/2024-01-01-hello.md"`.
///
/// The generator output directory is excluded regardless of the configured
/// patterns: the build writes there, and reacting to those writes would
/// rebuild forever.
#[derive(Clone)]
pub struct WatchFilter {
    include: GlobSet,
    exclude: GlobSet,
    /// Output directory relative to the project root, forward slashes, no
    /// trailing slash.
    output_root: String,
}

impl fmt::Debug for WatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchFilter")
            .field("output_root", &self.output_root)
            .finish_non_exhaustive()
    }
}

impl WatchFilter {
    pub fn new(include: &[String], exclude: &[String], output_root: &Path) -> Result<Self> {
        let include = build_globset(include).context("building include globset")?;
        let exclude = build_globset(exclude).context("building exclude globset")?;

        let output_root = output_root
            .to_string_lossy()
            .replace('\\', "/")
            .trim_start_matches("./")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            include,
            exclude,
            output_root,
        })
    }

    /// Filter for the `[watch]` and `[server].root` settings of a config.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::new(&cfg.watch.include, &cfg.watch.exclude, &cfg.server.root)
    }

    pub fn output_root(&self) -> &str {
        &self.output_root
    }

    /// Whether `rel_path` is inside the output directory (or is it).
    pub fn is_output(&self, rel_path: &str) -> bool {
        if self.output_root.is_empty() {
            return false;
        }
        rel_path == self.output_root
            || rel_path
                .strip_prefix(&self.output_root)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns true if a change at `rel_path` should trigger a rebuild.
    pub fn matches(&self, rel_path: &str) -> bool {
        if rel_path.is_empty() || self.is_output(rel_path) {
            return false;
        }
        self.include.is_match(rel_path) && !self.exclude.is_match(rel_path)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
