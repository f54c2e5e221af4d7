// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling subscription globs and the global exclusions (`patterns`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Collapsing bursts of events into one batch (`debounce`).
//! - (Optionally) content hashing so a save without changes does not
//!   rebuild (`cache`, `hash`).
//!
//! It does **not** know how steps are scheduled; it only turns filesystem
//! changes into cycle requests.

pub mod cache;
pub mod debounce;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use cache::FileCache;
pub use debounce::{is_temp_file, ChangeBatch, ChangeKind, Debouncer};
pub use event_handler::BatchHandler;
pub use patterns::{build_globset, Subscription, SubscriptionSet};
pub use watcher::{spawn_watcher, WatcherHandle};
