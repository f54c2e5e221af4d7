// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile, ServeSection};
use crate::errors::{Result, SitepipeError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let root = raw
            .paths
            .root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        Ok(ConfigFile::new_unchecked(root, raw))
    }
}

impl ConfigFile {
    /// Apply a `--port` override and re-check the serve section.
    pub fn with_port_override(mut self, port: Option<u16>) -> Result<Self> {
        if let Some(port) = port {
            self.serve.port = port;
            validate_serve(&self.serve)?;
        }
        Ok(self)
    }
}

/// Run every check against a raw config.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_output_paths(cfg)?;
    validate_globs(cfg)?;
    validate_subscriptions(cfg)?;
    validate_generator(cfg)?;
    validate_serve(&cfg.serve)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> SitepipeError {
    SitepipeError::ConfigError(msg.into())
}

/// Every path this tool deletes or overwrites must stay strictly inside the
/// project root.
fn validate_output_paths(cfg: &RawConfigFile) -> Result<()> {
    let outputs: [(&str, &Path); 4] = [
        ("[paths].site_dir", &cfg.paths.site_dir),
        ("[paths].staging_dir", &cfg.paths.staging_dir),
        ("[styles].output_dir", &cfg.styles.output_dir),
        ("[scripts].bundle", &cfg.scripts.bundle),
    ];

    for (key, path) in outputs {
        ensure_inside_root(key, path)?;
    }

    let site = normalized(&cfg.paths.site_dir);
    let staging = normalized(&cfg.paths.staging_dir);
    if site.starts_with(&staging) || staging.starts_with(&site) {
        return Err(config_error(format!(
            "[paths].site_dir ({}) and [paths].staging_dir ({}) must not contain each other",
            cfg.paths.site_dir.display(),
            cfg.paths.staging_dir.display()
        )));
    }

    Ok(())
}

fn ensure_inside_root(key: &str, path: &Path) -> Result<()> {
    if path.is_absolute() {
        return Err(config_error(format!(
            "{key} must be relative to the project root (got {})",
            path.display()
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(config_error(format!(
            "{key} must not contain '..' (got {})",
            path.display()
        )));
    }
    if normalized(path).as_os_str().is_empty() {
        return Err(config_error(format!(
            "{key} must name a path below the project root, not the root itself"
        )));
    }
    Ok(())
}

/// Drop `.` components so `./_site` and `_site` compare equal.
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn validate_globs(cfg: &RawConfigFile) -> Result<()> {
    let groups: [(&str, &Vec<String>); 3] = [
        ("[scripts].sources", &cfg.scripts.sources),
        ("[styles].sources", &cfg.styles.sources),
        ("[watch].exclude", &cfg.watch.exclude),
    ];
    for (key, patterns) in groups {
        check_globs(key, patterns)?;
    }
    Ok(())
}

fn check_globs(key: &str, patterns: &[String]) -> Result<()> {
    for pat in patterns {
        Glob::new(pat)
            .map_err(|e| config_error(format!("{key}: invalid glob pattern '{pat}': {e}")))?;
    }
    Ok(())
}

fn validate_subscriptions(cfg: &RawConfigFile) -> Result<()> {
    for (name, sub) in cfg.watch.subscriptions.iter() {
        if sub.patterns.is_empty() {
            return Err(config_error(format!(
                "[watch.subscriptions.{name}] must list at least one pattern"
            )));
        }
        check_globs(&format!("[watch.subscriptions.{name}].patterns"), &sub.patterns)?;
        check_globs(&format!("[watch.subscriptions.{name}].exclude"), &sub.exclude)?;
    }
    Ok(())
}

fn validate_generator(cfg: &RawConfigFile) -> Result<()> {
    let generator = &cfg.generator;

    if let Some(program) = &generator.program
        && program.trim().is_empty()
    {
        return Err(config_error("[generator].program must not be empty"));
    }

    if generator.destination_flag.trim().is_empty() {
        return Err(config_error("[generator].destination_flag must not be empty"));
    }

    if let Some(pattern) = &generator.error_pattern {
        Regex::new(pattern).map_err(|e| {
            config_error(format!("[generator].error_pattern is not a valid regex: {e}"))
        })?;
    }

    if let Some(transform) = &cfg.scripts.transform
        && transform.is_empty()
    {
        return Err(config_error(
            "[scripts].transform must name a command (omit it to disable transforms)",
        ));
    }

    Ok(())
}

fn validate_serve(serve: &ServeSection) -> Result<()> {
    if serve.port == 0 {
        return Err(config_error("[serve].port must be >= 1 (got 0)"));
    }
    if serve.live_reload {
        if serve.live_reload_port == 0 {
            return Err(config_error("[serve].live_reload_port must be >= 1 (got 0)"));
        }
        if serve.live_reload_port == serve.port {
            return Err(config_error(format!(
                "[serve].live_reload_port must differ from [serve].port (both {})",
                serve.port
            )));
        }
    }
    if serve.workers == 0 {
        return Err(config_error("[serve].workers must be >= 1 (got 0)"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_config_error(raw: RawConfigFile, needle: &str) {
        match ConfigFile::try_from(raw) {
            Err(SitepipeError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}")
            }
            Err(e) => panic!("expected ConfigError, got {e:?}"),
            Ok(_) => panic!("expected ConfigError, got Ok"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.serve.port, 4000);
        assert_eq!(cfg.watch.subscriptions.len(), 8);
    }

    #[test]
    fn port_override_is_rechecked() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        let cfg = cfg.with_port_override(Some(4100)).unwrap();
        assert_eq!(cfg.serve.port, 4100);

        let clash = cfg.with_port_override(Some(35729));
        assert!(matches!(clash, Err(SitepipeError::ConfigError(_))));
    }

    #[test]
    fn site_dir_may_not_be_root() {
        let mut raw = RawConfigFile::default();
        raw.paths.site_dir = PathBuf::from(".");
        expect_config_error(raw, "not the root itself");
    }

    #[test]
    fn bundle_may_not_escape_root() {
        let mut raw = RawConfigFile::default();
        raw.scripts.bundle = PathBuf::from("../outside/bundle.js");
        expect_config_error(raw, "'..'");
    }

    #[test]
    fn staging_inside_site_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.paths.staging_dir = PathBuf::from("./_site/tmp");
        expect_config_error(raw, "must not contain each other");
    }

    #[test]
    fn broken_glob_is_reported_with_its_key() {
        let mut raw = RawConfigFile::default();
        raw.styles.sources = vec!["_css/**/*.{css".to_string()];
        expect_config_error(raw, "[styles].sources");
    }

    #[test]
    fn same_port_for_http_and_reload_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.serve.live_reload_port = raw.serve.port;
        expect_config_error(raw, "must differ");
    }

    #[test]
    fn invalid_error_pattern_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.generator.error_pattern = Some("(unclosed".to_string());
        expect_config_error(raw, "error_pattern");
    }
}
