// src/assets/sources.rs

//! Expanding source globs into a sorted list of files.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::GlobMatcher;

use crate::fs::FileSystem;
use crate::watch::patterns::compile_glob;

/// One file matched by a [`SourceGlob`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the glob's literal base, e.g. `blog/post.scss` for
    /// `_css/**/*.scss`.
    pub within_base: PathBuf,
}

/// A root-relative glob split into its literal directory prefix and a
/// matcher.
///
/// The literal prefix is the part of the pattern before the first segment
/// that contains a glob meta character. Only that directory is walked.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

const GLOB_META: &[char] = &['*', '?', '[', '{'];

impl SourceGlob {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim_start_matches("./").to_string();
        let matcher = compile_glob(&pattern)?.compile_matcher();
        Ok(Self {
            base: literal_base(&pattern),
            pattern,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Literal directory prefix, relative to the project root.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Every file under `root` matching this glob, sorted by path.
    ///
    /// A missing base directory yields an empty list.
    pub fn collect(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<SourceFile>> {
        let base_dir = root.join(&self.base);
        if !fs.is_dir(&base_dir) {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut stack = vec![base_dir.clone()];

        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }
                if !fs.is_file(&path) {
                    continue;
                }
                let Ok(rel) = path.strip_prefix(root) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if !self.matcher.is_match(&rel_str) {
                    continue;
                }
                let within_base = path
                    .strip_prefix(&base_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| rel.to_path_buf());
                files.push(SourceFile { path, within_base });
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Expand several patterns, dropping duplicates. The result is sorted by
/// absolute path so that bundle order never depends on directory listing
/// order.
pub fn collect_sources(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<SourceFile>> {
    let mut all = Vec::new();
    for pattern in patterns {
        let glob = SourceGlob::new(pattern)?;
        all.extend(glob.collect(fs, root)?);
    }
    all.sort_by(|a, b| a.path.cmp(&b.path));
    all.dedup_by(|a, b| a.path == b.path);
    Ok(all)
}

fn literal_base(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments
        .iter()
        .take_while(|seg| !seg.contains(GLOB_META))
        .count();
    // A fully literal pattern names a file; its base is the parent.
    let take = if literal == segments.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };
    segments[..take].iter().collect()
}
