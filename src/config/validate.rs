// src/config/validate.rs

use std::path::Component;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SitewatchError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SitewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_generator(cfg)?;
    validate_output_root(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(SitewatchError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_generator(cfg: &RawConfigFile) -> Result<()> {
    if cfg.generator.program.trim().is_empty() {
        return Err(SitewatchError::ConfigError(
            "[generator].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// The output root feeds the watcher's self-exclusion, so it must be a plain
/// relative path inside the project.
fn validate_output_root(cfg: &RawConfigFile) -> Result<()> {
    let root = &cfg.server.root;

    if root.as_os_str().is_empty() {
        return Err(SitewatchError::ConfigError(
            "[server].root must not be empty".to_string(),
        ));
    }

    for component in root.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {
                return Err(SitewatchError::ConfigError(format!(
                    "[server].root must name a subdirectory, got {:?}",
                    root
                )));
            }
            _ => {
                return Err(SitewatchError::ConfigError(format!(
                    "[server].root must be a relative path without '..', got {:?}",
                    root
                )));
            }
        }
    }

    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.include.is_empty() {
        return Err(SitewatchError::ConfigError(
            "[watch].include must contain at least one pattern".to_string(),
        ));
    }

    for (key, patterns) in [("include", &cfg.watch.include), ("exclude", &cfg.watch.exclude)] {
        for pat in patterns {
            Glob::new(pat).map_err(|e| {
                SitewatchError::ConfigError(format!(
                    "[watch].{key} has invalid glob pattern '{pat}': {e}"
                ))
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.generator_display(), "jekyll build");
        assert_eq!(cfg.server.root, PathBuf::from("_site"));
    }

    #[test]
    fn rejects_parent_dir_output_root() {
        let mut raw = RawConfigFile::default();
        raw.server.root = PathBuf::from("../public");
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, SitewatchError::ConfigError(msg) if msg.contains("'..'")));
    }

    #[test]
    fn rejects_project_root_as_output() {
        let mut raw = RawConfigFile::default();
        raw.server.root = PathBuf::from(".");
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_bad_glob() {
        let mut raw = RawConfigFile::default();
        raw.watch.exclude.push("src/[".to_string());
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, SitewatchError::ConfigError(msg) if msg.contains("src/[")));
    }

    #[test]
    fn rejects_zero_queue_length() {
        let mut raw = RawConfigFile::default();
        raw.config.queue_length = 0;
        assert!(ConfigFile::try_from(raw).is_err());
    }
}
