// src/watch/debounce.rs

//! Pure debouncer: timing and per-path event deduplication only.
//!
//! Time is passed in explicitly so the batching rules can be tested without
//! sleeping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind};
use tracing::trace;

/// Sleep used when nothing is pending.
const IDLE_SLEEP: Duration = Duration::from_secs(86400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// One debounced batch: each path with its net change.
pub type ChangeBatch = HashMap<PathBuf, ChangeKind>;

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    changes: ChangeBatch,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            changes: HashMap::new(),
            last_event: None,
        }
    }

    /// Map a notify event to a change kind. Metadata-only and access
    /// events are dropped.
    pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Remove(_) => Some(ChangeKind::Removed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            _ => None,
        }
    }

    pub fn add_event(&mut self, event: &Event, now: Instant) {
        let Some(kind) = Self::classify(&event.kind) else {
            return;
        };
        for path in &event.paths {
            self.record(path, kind, now);
        }
    }

    /// Fold one change into the pending batch:
    /// - removed then created/modified: the file is back, keep the new kind
    /// - modified then removed: removed
    /// - created then removed: it never existed as far as a build cares
    /// - anything else: first kind wins
    pub fn record(&mut self, path: &Path, kind: ChangeKind, now: Instant) {
        if is_temp_file(path) {
            return;
        }

        match self.changes.get(path).copied() {
            None => {
                self.changes.insert(path.to_path_buf(), kind);
            }
            Some(existing) => match (existing, kind) {
                (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                    self.changes.insert(path.to_path_buf(), kind);
                }
                (ChangeKind::Modified, ChangeKind::Removed) => {
                    self.changes.insert(path.to_path_buf(), ChangeKind::Removed);
                }
                (ChangeKind::Created, ChangeKind::Removed) => {
                    self.changes.remove(path);
                }
                _ => {}
            },
        }

        trace!(path = %path.display(), ?kind, "debounce event");
        self.last_event = Some(now);
    }

    /// Whether the window has passed since the last event.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_event {
            Some(last) => now.saturating_duration_since(last) >= self.window,
            None => false,
        }
    }

    /// Take the pending batch once the window has passed. An empty batch
    /// (every change cancelled out) yields `None`.
    pub fn take_if_ready(&mut self, now: Instant) -> Option<ChangeBatch> {
        if !self.is_ready(now) {
            return None;
        }
        self.last_event = None;
        let changes = std::mem::take(&mut self.changes);
        (!changes.is_empty()).then_some(changes)
    }

    /// How long to sleep before the batch could be ready.
    pub fn sleep_duration(&self, now: Instant) -> Duration {
        let Some(last) = self.last_event else {
            return IDLE_SLEEP;
        };
        self.window
            .saturating_sub(now.saturating_duration_since(last))
            .max(Duration::from_millis(1))
    }

    pub fn pending(&self) -> usize {
        self.changes.len()
    }
}

/// Editor temp/backup artifacts.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || (name.starts_with('#') && name.ends_with('#'))
        || name == "4913"
}
