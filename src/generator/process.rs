// src/generator/process.rs

//! Spawning the generator and streaming its output.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::generator::output_log::{OutputLine, OutputStream};

/// A fully resolved generator command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl GeneratorInvocation {
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// Run the invocation to completion, forwarding every output line to
/// `lines`. Returns the exit code (`-1` when killed by a signal).
///
/// The child is owned by this future and killed if it is dropped early.
pub async fn spawn_and_stream(
    invocation: &GeneratorInvocation,
    lines: mpsc::Sender<OutputLine>,
) -> Result<i32> {
    info!(cmd = %invocation.display(), cwd = %invocation.cwd.display(), "starting generator");

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning generator `{}`", invocation.program))?;

    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(forward_lines(out, OutputStream::Stdout, lines.clone())));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(forward_lines(err, OutputStream::Stderr, lines.clone())));
    drop(lines);

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for generator `{}`", invocation.program))?;

    // Drain the readers so no line is lost after exit.
    for reader in [stdout, stderr].into_iter().flatten() {
        if let Err(e) = reader.await {
            debug!(error = %e, "generator output reader ended abnormally");
        }
    }

    let code = status.code().unwrap_or(-1);
    info!(exit_code = code, success = status.success(), "generator exited");
    Ok(code)
}

async fn forward_lines<R>(reader: R, stream: OutputStream, tx: mpsc::Sender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(text)) = lines.next_line().await {
        if tx.send(OutputLine { stream, text }).await.is_err() {
            break;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn streams_both_outputs_and_reports_exit_code() {
        let inv = GeneratorInvocation {
            program: "sh".into(),
            args: vec!["-c".into(), "echo out; echo err >&2; exit 4".into()],
            cwd: PathBuf::from("."),
        };
        let (tx, mut rx) = mpsc::channel(16);

        let code = spawn_and_stream(&inv, tx).await.unwrap();

        let mut got = Vec::new();
        while let Some(line) = rx.recv().await {
            got.push(line);
        }
        assert_eq!(code, 4);
        assert!(got.contains(&OutputLine {
            stream: OutputStream::Stdout,
            text: "out".into()
        }));
        assert!(got.contains(&OutputLine {
            stream: OutputStream::Stderr,
            text: "err".into()
        }));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let inv = GeneratorInvocation {
            program: "sitepipe-definitely-not-installed".into(),
            args: Vec::new(),
            cwd: PathBuf::from("."),
        };
        let (tx, _rx) = mpsc::channel(1);
        assert!(spawn_and_stream(&inv, tx).await.is_err());
    }
}
