// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate. Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// `[paths].root` is resolved against the directory containing the file, so
/// `sitepipe --config site/Sitepipe.toml` works from anywhere.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut raw = load_from_path(path)?;
    raw.paths.root = Some(resolve_root(config_dir(path), raw.paths.root.take()));
    ConfigFile::try_from(raw)
}

/// Load the explicitly requested config, or the default one if it exists,
/// or fall back to built-in defaults rooted at the current directory.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        info!(config = %path.display(), "loading config");
        return load_and_validate(path);
    }

    let default = default_config_path();
    if default.is_file() {
        info!(config = %default.display(), "loading config");
        return load_and_validate(&default);
    }

    debug!("no {} found; using built-in defaults", default.display());
    let mut raw = RawConfigFile::default();
    raw.paths.root = Some(current_dir());
    ConfigFile::try_from(raw)
}

/// Default config location: `Sitepipe.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitepipe.toml")
}

/// Figure out the directory a config file lives in.
///
/// A bare filename like "Sitepipe.toml" (parent = "") means the current
/// working directory.
fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => current_dir(),
    }
}

fn resolve_root(config_dir: PathBuf, root: Option<PathBuf>) -> PathBuf {
    match root {
        Some(root) if root.is_absolute() => root,
        Some(root) => config_dir.join(root),
        None => config_dir,
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
