// src/watch/hash.rs

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

/// Compute the hash of a single file. A missing file hashes to `None`.
pub fn compute_file_hash(path: &Path) -> Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("opening file for hashing: {:?}", path));
        }
    };

    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(hasher.finalize().to_hex().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn identical_content_hashes_equal() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        File::create(&a).unwrap().write_all(b"same").unwrap();
        File::create(&b).unwrap().write_all(b"same").unwrap();

        assert_eq!(compute_file_hash(&a).unwrap(), compute_file_hash(&b).unwrap());
        assert_eq!(compute_file_hash(&dir.path().join("missing")).unwrap(), None);
    }
}
