// src/watch/event_handler.rs

//! Turns a debounced batch of changes into the steps to run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::build::StepSet;
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::debounce::{is_temp_file, ChangeBatch};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::SubscriptionSet;

/// Maps changed paths to subscriptions and merges their sequences.
///
/// With `use_hash`, a path only counts when its content hash differs from the
/// last one seen (deletions always count).
#[derive(Debug)]
pub struct BatchHandler {
    root: PathBuf,
    subscriptions: SubscriptionSet,
    cache: Option<FileCache>,
}

impl BatchHandler {
    pub fn new(root: impl Into<PathBuf>, subscriptions: SubscriptionSet, use_hash: bool) -> Self {
        Self {
            root: root.into(),
            subscriptions,
            cache: use_hash.then(FileCache::new),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hash every watched file under the root so that the first save of an
    /// unchanged file is not reported. No-op without `use_hash`.
    pub fn prime(&mut self, fs: &dyn FileSystem) -> Result<usize> {
        let Some(cache) = self.cache.as_mut() else {
            return Ok(0);
        };

        let mut stack = vec![self.root.clone()];
        let mut primed = 0usize;
        while let Some(dir) = stack.pop() {
            for entry in fs.read_dir(&dir)? {
                let Some(rel) = relative_str(&self.root, &entry) else {
                    continue;
                };
                if self.subscriptions.is_excluded(&rel) {
                    continue;
                }
                if fs.is_dir(&entry) {
                    stack.push(entry);
                } else if self.subscriptions.matching(&rel).next().is_some() {
                    cache.prime(&entry)?;
                    primed += 1;
                }
            }
        }

        debug!(primed, "primed content hash cache");
        Ok(primed)
    }

    /// Steps requested by `batch`, or `None` when nothing relevant changed.
    pub fn handle(&mut self, batch: &ChangeBatch) -> Option<StepSet> {
        let mut paths: Vec<&PathBuf> = batch.keys().collect();
        paths.sort();

        let mut steps = StepSet::new();
        let mut matched = Vec::new();

        for path in paths {
            if is_temp_file(path) {
                continue;
            }
            let Some(rel) = relative_str(&self.root, path) else {
                warn!(
                    path = %path.display(),
                    root = %self.root.display(),
                    "could not relativize event path"
                );
                continue;
            };

            let sequences = self.subscriptions.sequences_for(&rel);
            if sequences.is_empty() {
                debug!(rel = %rel, "no subscription matches");
                continue;
            }

            if !self.content_changed(path) {
                info!(path = %rel, "content unchanged; skipping");
                continue;
            }

            steps.merge(&StepSet::from_sequences(sequences));
            matched.push(rel);
        }

        if steps.is_empty() {
            return None;
        }

        info!(files = ?matched, steps = %steps, "watched files changed");
        Some(steps)
    }

    fn content_changed(&mut self, path: &Path) -> bool {
        let Some(cache) = self.cache.as_mut() else {
            return true;
        };
        match cache.refresh(path) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to hash file; treating as changed");
                true
            }
        }
    }
}
