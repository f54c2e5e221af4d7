// src/generator/output_log.rs

//! Line logger for generator output.
//!
//! The process reader tasks push [`OutputLine`]s into a bounded channel; a
//! single logger task drains it, tags every line and picks a level.

use std::collections::VecDeque;

use regex::Regex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Level};

/// Capacity of the reader -> logger channel.
pub const LINE_CHANNEL_CAPACITY: usize = 256;

/// Lines kept for the failure summary.
const TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// Decides the tag and level of each line.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    tag: String,
    error_pattern: Option<Regex>,
}

impl LineClassifier {
    pub fn new(tag: impl Into<String>, error_pattern: Option<Regex>) -> Self {
        Self {
            tag: tag.into(),
            error_pattern,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn level(&self, line: &OutputLine) -> Level {
        if self
            .error_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(&line.text))
        {
            return Level::ERROR;
        }
        match line.stream {
            OutputStream::Stdout => Level::INFO,
            OutputStream::Stderr => Level::WARN,
        }
    }
}

/// What the logger saw during one run.
#[derive(Debug, Clone, Default)]
pub struct OutputSummary {
    pub lines: usize,
    pub error_lines: usize,
    /// The last few lines, oldest first.
    pub tail: Vec<String>,
}

/// Spawn the logger task. It finishes once every sender is dropped.
pub fn spawn_line_logger(
    mut rx: mpsc::Receiver<OutputLine>,
    classifier: LineClassifier,
) -> JoinHandle<OutputSummary> {
    tokio::spawn(async move {
        let mut summary = OutputSummary::default();
        let mut tail = VecDeque::with_capacity(TAIL_LINES);

        while let Some(line) = rx.recv().await {
            let tag = classifier.tag();
            match classifier.level(&line) {
                Level::ERROR => {
                    summary.error_lines += 1;
                    error!(target: "sitepipe::generator", "{tag}: {}", line.text);
                }
                Level::WARN => warn!(target: "sitepipe::generator", "{tag}: {}", line.text),
                _ => info!(target: "sitepipe::generator", "{tag}: {}", line.text),
            }

            summary.lines += 1;
            if tail.len() == TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.text);
        }

        summary.tail = tail.into_iter().collect();
        summary
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(stream: OutputStream, text: &str) -> OutputLine {
        OutputLine {
            stream,
            text: text.to_string(),
        }
    }

    #[test]
    fn levels_follow_stream_and_pattern() {
        let re = Regex::new(r"(?i)\berror\b|liquid exception").unwrap();
        let c = LineClassifier::new("Jekyll", Some(re));

        assert_eq!(c.level(&line(OutputStream::Stdout, "Generating...")), Level::INFO);
        assert_eq!(c.level(&line(OutputStream::Stderr, "Deprecation")), Level::WARN);
        assert_eq!(
            c.level(&line(OutputStream::Stdout, "Liquid Exception: bad tag")),
            Level::ERROR
        );
        assert_eq!(c.level(&line(OutputStream::Stdout, "0 errors")), Level::INFO);
    }

    #[tokio::test]
    async fn logger_keeps_a_bounded_tail() {
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let handle = spawn_line_logger(rx, LineClassifier::new("Jekyll", None));

        for i in 0..30 {
            tx.send(line(OutputStream::Stdout, &format!("line {i}")))
                .await
                .unwrap();
        }
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(summary.lines, 30);
        assert_eq!(summary.tail.len(), TAIL_LINES);
        assert_eq!(summary.tail[0], "line 10");
    }
}
