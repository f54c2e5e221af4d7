// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::types::BuildSequence;

/// Compile one root-relative glob.
///
/// `*` and `?` never cross a `/`; use `**` for that.
pub(crate) fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern.trim_start_matches("./"))
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// Compiled glob patterns for one watch category, e.g. `posts`.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"_posts/2020-01-01-hello.md"`) into [`Subscription::matches`].
#[derive(Clone)]
pub struct Subscription {
    name: String,
    sequence: BuildSequence,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn new(
        name: impl Into<String>,
        patterns: &[String],
        exclude: &[String],
        sequence: BuildSequence,
    ) -> Result<Self> {
        let name = name.into();
        let watch_set = build_globset(patterns)
            .with_context(|| format!("building watch globset for subscription {name}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for subscription {name}"))?,
            )
        };
        Ok(Self {
            name,
            sequence,
            watch_set,
            exclude_set,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> BuildSequence {
        self.sequence
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Every subscription plus the exclusions that apply to all of them.
#[derive(Debug, Clone)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
    global_exclude: GlobSet,
}

impl SubscriptionSet {
    pub fn new(global_exclude: &[String]) -> Result<Self> {
        Ok(Self {
            subscriptions: Vec::new(),
            global_exclude: build_globset(global_exclude)
                .context("building global watch excludes")?,
        })
    }

    /// Subscriptions from `[watch]`, excluding everything this tool writes.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut global = cfg.watch.exclude.clone();
        global.extend(cfg.generated_excludes());

        let mut set = Self::new(&global)?;
        for (name, sub) in &cfg.watch.subscriptions {
            set.subscribe(name.clone(), &sub.patterns, &sub.exclude, sub.sequence)?;
        }
        Ok(set)
    }

    /// Register `patterns` (minus `exclude`) as a trigger for `sequence`.
    pub fn subscribe(
        &mut self,
        name: impl Into<String>,
        patterns: &[String],
        exclude: &[String],
        sequence: BuildSequence,
    ) -> Result<()> {
        self.subscriptions
            .push(Subscription::new(name, patterns, exclude, sequence)?);
        Ok(())
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.global_exclude.is_match(rel_path)
    }

    /// Subscriptions interested in `rel_path`; none if it is globally excluded.
    pub fn matching<'a>(&'a self, rel_path: &'a str) -> impl Iterator<Item = &'a Subscription> {
        let excluded = self.is_excluded(rel_path);
        self.subscriptions
            .iter()
            .filter(move |s| !excluded && s.matches(rel_path))
    }

    pub fn sequences_for(&self, rel_path: &str) -> BTreeSet<BuildSequence> {
        self.matching(rel_path).map(|s| s.sequence()).collect()
    }
}
