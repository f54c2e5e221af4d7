// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// A direct `strip_prefix(root)` is tried first. If that fails (symlinks, or
/// `/private/var` vs `/var` on macOS) both paths are canonicalized and the
/// prefix is stripped again. A deleted file cannot be canonicalized, so its
/// parent is canonicalized instead.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slashes(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon.strip_prefix(&root_canon).ok().map(slashes)
}

fn slashes(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
