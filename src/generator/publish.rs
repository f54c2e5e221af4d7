// src/generator/publish.rs

//! Staging and publishing of generated sites.
//!
//! Build-mode runs write into a staging directory. Publishing swaps it in
//! with two renames, so the served directory always holds a complete tree:
//!
//! 1. `site` -> `retired`
//! 2. `staging` -> `site`
//! 3. remove `retired`
//!
//! If step 2 fails the retired tree is moved back.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::fs::{copy_tree, FileSystem};

#[derive(Debug)]
pub struct Publisher<'a> {
    fs: &'a dyn FileSystem,
    site: PathBuf,
    staging: PathBuf,
    retired: PathBuf,
}

impl<'a> Publisher<'a> {
    pub fn new(fs: &'a dyn FileSystem, cfg: &ConfigFile) -> Self {
        Self {
            fs,
            site: cfg.site_dir(),
            staging: cfg.staging_dir(),
            retired: cfg.retired_site_dir(),
        }
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Prepare an empty staging directory, or a copy of the live site when
    /// `incremental` so the generator can skip unchanged pages.
    pub fn stage(&self, incremental: bool) -> Result<()> {
        self.fs.remove_all(&self.staging)?;
        self.fs.remove_all(&self.retired)?;

        if incremental && self.fs.is_dir(&self.site) {
            debug!(from = %self.site.display(), to = %self.staging.display(), "seeding staging from live site");
            copy_tree(self.fs, &self.site, &self.staging)
        } else {
            self.fs.create_dir_all(&self.staging)
        }
    }

    /// Swap the staged tree in as the live site.
    pub fn publish(&self) -> Result<()> {
        if !self.fs.is_dir(&self.staging) {
            bail!("nothing staged at {}", self.staging.display());
        }

        self.fs.remove_all(&self.retired)?;
        if let Some(parent) = self.site.parent() {
            self.fs.create_dir_all(parent)?;
        }
        let had_site = self.fs.exists(&self.site);
        if had_site {
            self.fs.rename(&self.site, &self.retired)?;
        }

        if let Err(err) = self.fs.rename(&self.staging, &self.site) {
            if had_site {
                if let Err(restore) = self.fs.rename(&self.retired, &self.site) {
                    warn!(error = %restore, "could not restore previous site after failed publish");
                }
            }
            return Err(err);
        }

        if let Err(err) = self.fs.remove_all(&self.retired) {
            warn!(path = %self.retired.display(), error = %err, "could not remove retired site");
        }
        info!(site = %self.site.display(), "published site");
        Ok(())
    }

    /// Throw away a staged tree after a failed run.
    pub fn discard(&self) -> Result<()> {
        self.fs.remove_all(&self.staging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use crate::fs::MockFileSystem;

    fn config() -> ConfigFile {
        let mut raw = RawConfigFile::default();
        raw.paths.root = Some(PathBuf::from("/p"));
        ConfigFile::try_from(raw).unwrap()
    }

    #[test]
    fn incremental_stage_copies_live_site() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/_site/index.html", "old");
        let cfg = config();
        let publisher = Publisher::new(&fs, &cfg);

        publisher.stage(true).unwrap();

        assert_eq!(
            fs.read_to_string(Path::new("/p/.sitepipe/staging/index.html")).unwrap(),
            "old"
        );
    }

    #[test]
    fn publish_swaps_staging_in() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/_site/index.html", "old");
        fs.add_file("/p/_site/gone.html", "gone");
        let cfg = config();
        let publisher = Publisher::new(&fs, &cfg);

        publisher.stage(false).unwrap();
        fs.add_file("/p/.sitepipe/staging/index.html", "new");
        publisher.publish().unwrap();

        assert_eq!(fs.read_to_string(Path::new("/p/_site/index.html")).unwrap(), "new");
        assert!(!fs.exists(Path::new("/p/_site/gone.html")));
        assert!(!fs.exists(Path::new("/p/.sitepipe/staging")));
        assert!(!fs.exists(Path::new("/p/.sitepipe/staging.previous")));
    }

    #[test]
    fn publish_creates_missing_parents_of_a_nested_site_dir() {
        let fs = MockFileSystem::new();
        let mut raw = RawConfigFile::default();
        raw.paths.root = Some(PathBuf::from("/p"));
        raw.paths.site_dir = PathBuf::from("public/site");
        let cfg = ConfigFile::try_from(raw).unwrap();
        let publisher = Publisher::new(&fs, &cfg);

        publisher.stage(false).unwrap();
        fs.add_file("/p/.sitepipe/staging/index.html", "new");
        publisher.publish().unwrap();

        assert_eq!(
            fs.read_to_string(Path::new("/p/public/site/index.html")).unwrap(),
            "new"
        );
    }

    #[test]
    fn failed_swap_restores_previous_site() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/_site/index.html", "old");
        let cfg = config();
        let publisher = Publisher::new(&fs, &cfg);
        publisher.stage(false).unwrap();
        fs.add_file("/p/.sitepipe/staging/index.html", "new");
        // The staging tree cannot be moved, so the live site must survive.
        fs.set_read_only("/p/.sitepipe/staging");
        assert!(publisher.publish().is_err());
        assert_eq!(fs.read_to_string(Path::new("/p/_site/index.html")).unwrap(), "old");
    }
}
