// src/assets/transform.rs

//! External per-file tools (script transpiler, style compiler).
//!
//! A tool is an argv whose first element is the program. The source is
//! written to its stdin and the result read from its stdout. `{file}` and
//! `{dir}` in any argument are replaced with the source path and the
//! directory that contains it.

use std::fmt::Debug;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

/// Runs an external tool over one source file.
pub trait ToolRunner: Send + Sync + Debug {
    fn run(&self, argv: &[String], cwd: &Path, input: &[u8]) -> Result<Vec<u8>>;
}

/// Spawns real processes via `std::process`. Called from blocking contexts
/// only (compile steps run on the blocking pool).
#[derive(Debug, Clone, Default)]
pub struct ProcessToolRunner;

impl ToolRunner for ProcessToolRunner {
    fn run(&self, argv: &[String], cwd: &Path, input: &[u8]) -> Result<Vec<u8>> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty tool command"))?;

        debug!(program = %program, ?args, "spawning external tool");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn `{program}`"))?;

        // Feed stdin from a separate thread so a tool that starts writing
        // before it has read all input cannot deadlock against us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin of `{program}` was not captured"))?;
        let input = input.to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .with_context(|| format!("waiting for `{program}`"))?;

        match writer.join() {
            Ok(Ok(())) => {}
            // A tool may legitimately close stdin early; its exit status decides.
            Ok(Err(e)) => debug!(program = %program, error = %e, "tool closed stdin early"),
            Err(_) => bail!("stdin writer for `{program}` panicked"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{program}` exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        Ok(output.stdout)
    }
}

/// Substitute `{file}` / `{dir}` placeholders for `source`.
pub fn expand_placeholders(argv: &[String], source: &Path) -> Vec<String> {
    let file = source.to_string_lossy();
    let dir = source
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    argv.iter()
        .map(|arg| arg.replace("{file}", &file).replace("{dir}", &dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_replaced_inside_arguments() {
        let argv = vec![
            "sass".to_string(),
            "--stdin".to_string(),
            "--load-path={dir}".to_string(),
            "{file}".to_string(),
        ];
        let out = expand_placeholders(&argv, Path::new("/p/_css/main.scss"));
        assert_eq!(out[2], "--load-path=/p/_css");
        assert_eq!(out[3], "/p/_css/main.scss");
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_pipes_stdin_to_stdout() {
        let runner = ProcessToolRunner;
        let out = runner
            .run(&["cat".to_string()], Path::new("."), b"var a = 1;")
            .unwrap();
        assert_eq!(out, b"var a = 1;");
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_reports_non_zero_exit() {
        let runner = ProcessToolRunner;
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo broken >&2; exit 3".to_string(),
        ];
        let err = runner.run(&argv, Path::new("."), b"").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
