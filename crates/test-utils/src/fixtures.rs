#![allow(dead_code)]

//! On-disk project fixtures.

use std::fs;
use std::path::{Path, PathBuf};

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(&path, contents).expect("write fixture file");
    path
}

/// A small blog: two scripts, a stylesheet with a partial, one post.
pub fn blog_sources(root: &Path) {
    write_file(root, "_scripts/a.js", "var a = 1;");
    write_file(root, "_scripts/b.js", "var b = 2;");
    write_file(root, "_css/main.css", "body { color: red; }");
    write_file(root, "_css/_partial.css", "p { margin: 0; }");
    write_file(root, "_posts/2024-01-01-hello.md", "# hello");
    write_file(root, "_config.yml", "title: test");
}

/// Every file under `dir`, relative and with forward slashes, sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(rel) = path.strip_prefix(dir) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    out.sort();
    out
}

/// A shell script standing in for the site generator.
///
/// It finds the directory after `--destination`, writes `index.html` there
/// with `marker` as body, and exits with `exit_code`. Its argv is appended to
/// `args.log` next to the script.
#[cfg(unix)]
pub fn fake_generator(dir: &Path, marker: &str, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-generator.sh");
    let log = dir.join("args.log");
    let body = format!(
        r#"#!/bin/sh
echo "$@" >> "{log}"
dest=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--destination" ]; then dest="$2"; fi
  shift
done
echo "generating into $dest"
mkdir -p "$dest"
printf '%s' "<html><body>{marker}</body></html>" > "$dest/index.html"
if [ {exit_code} -ne 0 ]; then echo "Error: build failed" 1>&2; fi
exit {exit_code}
"#,
        log = log.display(),
    );
    fs::write(&script, body).expect("write fake generator");
    let mut perms = fs::metadata(&script).expect("stat fake generator").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).expect("chmod fake generator");
    script
}
