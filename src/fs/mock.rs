// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    /// Mutations under these prefixes fail, to simulate permission errors.
    read_only: BTreeSet<PathBuf>,
}

/// In-memory filesystem for tests. Parent directories are created
/// implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut state = self.lock();
        ensure_parents(&mut state.entries, path);
        state
            .entries
            .insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        ensure_parents(&mut state.entries, path);
        state.entries.insert(path.to_path_buf(), MockEntry::Dir);
    }

    /// Make every mutation at or below `prefix` fail.
    pub fn set_read_only(&self, prefix: impl AsRef<Path>) {
        self.lock().read_only.insert(prefix.as_ref().to_path_buf());
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn check_writable(state: &MockState, path: &Path) -> Result<()> {
        if state.read_only.iter().any(|p| path.starts_with(p)) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        Ok(())
    }
}

fn ensure_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir.as_os_str().is_empty() {
            break;
        }
        entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
        current = dir.parent();
    }
}

fn subtree(entries: &BTreeMap<PathBuf, MockEntry>, root: &Path) -> Vec<PathBuf> {
    entries
        .keys()
        .filter(|k| k.starts_with(root))
        .cloned()
        .collect()
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        {
            let state = self.lock();
            Self::check_writable(&state, path)?;
            if matches!(state.entries.get(path), Some(MockEntry::Dir)) {
                return Err(anyhow!("Is a directory: {:?}", path));
            }
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir) => Ok(state
                .entries
                .keys()
                .filter(|k| k.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let state = self.lock();
        Self::check_writable(&state, path)?;
        if matches!(state.entries.get(path), Some(MockEntry::File(_))) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        drop(state);
        self.add_dir(path);
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        Self::check_writable(&state, path)?;
        for key in subtree(&state.entries, path) {
            state.entries.remove(&key);
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        Self::check_writable(&state, from)?;
        Self::check_writable(&state, to)?;

        if !state.entries.contains_key(from) {
            return Err(anyhow!("No such file or directory: {:?}", from));
        }
        if state.entries.keys().any(|k| k.starts_with(to) && k != to) {
            return Err(anyhow!("Directory not empty: {:?}", to));
        }
        if let Some(parent) = to.parent()
            && !parent.as_os_str().is_empty()
            && parent != Path::new("/")
            && !matches!(state.entries.get(parent), Some(MockEntry::Dir))
        {
            return Err(anyhow!("No such file or directory: {:?}", parent));
        }
        state.entries.remove(to);

        for key in subtree(&state.entries, from) {
            if let Some(entry) = state.entries.remove(&key) {
                let rest = key.strip_prefix(from).unwrap_or(Path::new(""));
                let target = if rest.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(rest)
                };
                state.entries.insert(target, entry);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_dir_lists_direct_children_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/a.txt", "a");
        fs.add_file("/r/sub/b.txt", "b");

        let mut children = fs.read_dir(Path::new("/r")).unwrap();
        children.sort();
        assert_eq!(children, vec![PathBuf::from("/r/a.txt"), PathBuf::from("/r/sub")]);
    }

    #[test]
    fn rename_moves_whole_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/stage/index.html", "new");
        fs.add_file("/r/stage/blog/index.html", "blog");

        fs.rename(Path::new("/r/stage"), Path::new("/r/_site")).unwrap();

        assert!(!fs.exists(Path::new("/r/stage")));
        assert_eq!(fs.read_to_string(Path::new("/r/_site/blog/index.html")).unwrap(), "blog");
    }

    #[test]
    fn rename_into_a_missing_directory_fails() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/stage/index.html", "new");

        assert!(fs.rename(Path::new("/r/stage"), Path::new("/r/public/site")).is_err());
        assert!(fs.is_file(Path::new("/r/stage/index.html")));
    }

    #[test]
    fn read_only_prefix_rejects_mutation() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/_site/index.html", "x");
        fs.set_read_only("/r/_site");

        assert!(fs.remove_all(Path::new("/r/_site")).is_err());
        assert!(fs.write(Path::new("/r/_site/new.html"), b"y").is_err());
        assert!(fs.is_file(Path::new("/r/_site/index.html")));
    }
}
