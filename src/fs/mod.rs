// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

pub use mock::MockFileSystem;

/// Abstract filesystem interface used by the asset compiler, the cleaner
/// and the publish step.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write a file, creating missing parent directories.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file or a whole directory tree. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Rename a file or directory, replacing a destination file.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents).with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("inspecting {:?}", path)),
        };
        if meta.is_dir() {
            fs::remove_dir_all(path).with_context(|| format!("removing dir {:?}", path))
        } else {
            fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).with_context(|| format!("renaming {:?} to {:?}", from, to))
    }
}

/// Recursively copy the tree at `from` into `to` (which is created).
pub fn copy_tree(fs: &dyn FileSystem, from: &Path, to: &Path) -> Result<()> {
    fs.create_dir_all(to)?;
    for entry in fs.read_dir(from)? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = to.join(name);
        if fs.is_dir(&entry) {
            copy_tree(fs, &entry, &target)?;
        } else {
            let bytes = fs.read(&entry)?;
            fs.write(&target, &bytes)?;
        }
    }
    Ok(())
}

/// Write `contents` to `path` unless the file already holds exactly those
/// bytes. The new content lands in a sibling temp file first and is renamed
/// over the target, so readers never observe a half-written file.
///
/// Returns `true` if the file was (re)written.
pub fn write_if_changed(fs: &dyn FileSystem, path: &Path, contents: &[u8]) -> Result<bool> {
    if fs.is_file(path) {
        if let Ok(existing) = fs.read(path) {
            if existing == contents {
                return Ok(false);
            }
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".sitepipe-tmp");
    let tmp = PathBuf::from(tmp_name);

    fs.write(&tmp, contents)?;
    if let Err(e) = fs.rename(&tmp, path) {
        let _ = fs.remove_all(&tmp);
        return Err(e);
    }
    Ok(true)
}
