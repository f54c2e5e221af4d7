// src/assets/clean.rs

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::assets::AssetCompiler;

impl AssetCompiler {
    /// Remove every generated artifact: the site, the staging area (and a
    /// leftover retired site from an interrupted publish), the style output
    /// directory and the script bundle.
    ///
    /// Returns the paths that existed and were removed.
    pub fn clean(&self) -> Result<Vec<PathBuf>> {
        let cfg = self.config();
        let targets = [
            cfg.site_dir(),
            cfg.staging_dir(),
            cfg.retired_site_dir(),
            cfg.styles_output_dir(),
            cfg.bundle_path(),
        ];

        for target in &targets {
            ensure_below_root(&cfg.root, target)?;
        }

        let mut removed = Vec::new();
        for target in targets {
            if !self.fs().exists(&target) {
                debug!(path = %target.display(), "nothing to clean");
                continue;
            }
            self.fs().remove_all(&target)?;
            info!(path = %target.display(), "removed");
            removed.push(target);
        }
        Ok(removed)
    }
}

/// `path` must be strictly inside `root`, judged lexically.
fn ensure_below_root(root: &Path, path: &Path) -> Result<()> {
    let Ok(rel) = path.strip_prefix(root) else {
        bail!(
            "refusing to remove {} (outside project root {})",
            path.display(),
            root.display()
        );
    };
    let mut depth = 0usize;
    for component in rel.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            _ => bail!("refusing to remove {} (escapes project root)", path.display()),
        }
    }
    if depth == 0 {
        bail!("refusing to remove the project root {}", root.display());
    }
    Ok(())
}
