// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::watch::hash::compute_file_hash;

/// Last known content hash of every watched file (`use_hash = true`).
///
/// A file that was never seen counts as changed the first time, unless the
/// cache was primed with it at startup.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, Option<String>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            hashes: HashMap::new(),
        }
    }

    /// Record the current hash of `path` without reporting a change.
    pub fn prime(&mut self, path: &Path) -> Result<()> {
        let hash = compute_file_hash(path)?;
        self.hashes.insert(path.to_path_buf(), hash);
        Ok(())
    }

    /// Re-hash `path` and report whether its content differs from the last
    /// recorded state. Deletion counts as a change.
    pub fn refresh(&mut self, path: &Path) -> Result<bool> {
        let hash = compute_file_hash(path)?;
        let changed = match self.hashes.get(path) {
            Some(previous) => *previous != hash,
            None => true,
        };
        if changed {
            debug!(path = %path.display(), "content hash changed");
        }
        self.hashes.insert(path.to_path_buf(), hash);
        Ok(changed)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
