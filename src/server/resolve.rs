// src/server/resolve.rs

//! URL to filesystem path resolution with clean-URL fallbacks.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL against `root`.
///
/// In order: the file itself, `<path>/index.html`, then `<path>.html` for
/// extension-less paths. Anything that would leave `root` (a `..` segment or
/// a symlink pointing outside) resolves to `None`.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url)?;
    let root_canonical = root.canonicalize().ok()?;
    let local = root.join(&clean);

    let mut candidates = vec![local.clone(), local.join("index.html")];
    if !clean.is_empty() && local.extension().is_none() {
        let mut html = local.into_os_string();
        html.push(".html");
        candidates.push(PathBuf::from(html));
    }

    candidates
        .into_iter()
        .find_map(|candidate| contained_file(&candidate, &root_canonical))
}

/// The custom error page, if the site has one.
pub fn not_found_page(root: &Path) -> Option<PathBuf> {
    let root_canonical = root.canonicalize().ok()?;
    contained_file(&root.join("404.html"), &root_canonical)
}

fn contained_file(candidate: &Path, root_canonical: &Path) -> Option<PathBuf> {
    let canonical = candidate.canonicalize().ok()?;
    (canonical.starts_with(root_canonical) && canonical.is_file()).then_some(canonical)
}

/// Decode, drop query and fragment, trim slashes. `None` for traversal
/// attempts.
fn normalize_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let trimmed = decoded.trim_matches('/');

    let traversal = trimmed
        .split(['/', '\\'])
        .any(|segment| segment == ".." || segment.contains('\0'));
    if traversal {
        return None;
    }
    Some(trimmed.to_string())
}
