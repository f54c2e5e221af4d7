// src/generator/mod.rs

//! Adapter around the external static-site generator.
//!
//! - [`process`] spawns the generator and streams stdout/stderr line by line.
//! - [`output_log`] owns the logger task that tags and levels those lines.
//! - [`publish`] stages build output and swaps it in on success.

pub mod output_log;
pub mod process;
pub mod publish;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::config::{ConfigFile, GeneratorSection};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::GeneratorMode;

pub use output_log::{LineClassifier, OutputLine, OutputStream};
pub use process::GeneratorInvocation;
pub use publish::Publisher;

use output_log::{spawn_line_logger, LINE_CHANNEL_CAPACITY};
use process::spawn_and_stream;

/// Optional generator flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneratorFlags {
    pub watch: bool,
    pub incremental: bool,
    pub drafts: bool,
}

impl GeneratorFlags {
    pub fn from_config(section: &GeneratorSection) -> Self {
        Self {
            watch: section.watch,
            incremental: section.incremental,
            drafts: section.drafts,
        }
    }
}

/// Runs the generator, one process at a time.
#[derive(Debug)]
pub struct SiteGenerator {
    cfg: Arc<ConfigFile>,
    fs: Arc<dyn FileSystem>,
    classifier: LineClassifier,
    running: Mutex<()>,
}

impl SiteGenerator {
    pub fn new(cfg: Arc<ConfigFile>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let error_pattern = cfg
            .generator
            .error_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("compiling [generator].error_pattern")?;
        let classifier = LineClassifier::new(cfg.generator.log_tag.clone(), error_pattern);

        Ok(Self {
            cfg,
            fs,
            classifier,
            running: Mutex::new(()),
        })
    }

    pub fn from_config(cfg: Arc<ConfigFile>) -> Result<Self> {
        Self::new(cfg, Arc::new(RealFileSystem))
    }

    /// Command line for one run writing into `destination`:
    /// `<mode> [--watch] [--incremental] [--drafts] [extra args] --destination <dir>`.
    pub fn invocation(
        &self,
        mode: GeneratorMode,
        flags: GeneratorFlags,
        destination: &Path,
    ) -> GeneratorInvocation {
        let section = &self.cfg.generator;
        let mut args = vec![mode.as_arg().to_string()];
        if flags.watch {
            args.push("--watch".into());
        }
        if flags.incremental {
            args.push("--incremental".into());
        }
        if flags.drafts {
            args.push("--drafts".into());
        }
        args.extend(section.extra_args.iter().cloned());
        args.push(section.destination_flag.clone());
        args.push(destination.to_string_lossy().into_owned());

        GeneratorInvocation {
            program: self.cfg.generator_program(),
            args,
            cwd: self.cfg.root.clone(),
        }
    }

    /// Run the generator and return its exit code.
    ///
    /// `Build` writes into staging and publishes only on exit code 0.
    /// `Serve` writes straight into the site directory and normally runs
    /// until interrupted.
    pub async fn run(&self, mode: GeneratorMode, flags: GeneratorFlags) -> Result<i32> {
        let _guard = self.running.lock().await;
        match mode {
            GeneratorMode::Build => self.run_build(flags).await,
            GeneratorMode::Serve => {
                let inv = self.invocation(mode, flags, &self.cfg.site_dir());
                self.run_streaming(&inv).await
            }
        }
    }

    async fn run_build(&self, flags: GeneratorFlags) -> Result<i32> {
        // A watching build never exits, so it could never be published.
        let flags = GeneratorFlags {
            watch: false,
            ..flags
        };

        self.with_publisher(move |p| p.stage(flags.incremental))
            .await
            .context("preparing staging directory")?;

        let inv = self.invocation(GeneratorMode::Build, flags, &self.cfg.staging_dir());
        let result = self.run_streaming(&inv).await;

        match result {
            Ok(0) => {
                self.with_publisher(|p| p.publish())
                    .await
                    .context("publishing generated site")?;
                Ok(0)
            }
            other => {
                if let Err(err) = self.with_publisher(|p| p.discard()).await {
                    warn!(error = %err, "could not discard staging directory");
                }
                info!(site = %self.cfg.site_dir().display(), "previous site left in place");
                other
            }
        }
    }

    async fn run_streaming(&self, inv: &GeneratorInvocation) -> Result<i32> {
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let logger = spawn_line_logger(rx, self.classifier.clone());

        let result = spawn_and_stream(inv, tx).await;
        let summary = logger.await.unwrap_or_default();

        if let Ok(code) = result
            && code != 0
        {
            error!(
                exit_code = code,
                lines = summary.lines,
                error_lines = summary.error_lines,
                "generator failed; last output:\n{}",
                summary.tail.join("\n")
            );
        }
        result
    }

    /// Filesystem work for staging/publishing runs on the blocking pool.
    async fn with_publisher<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Publisher<'_>) -> Result<()> + Send + 'static,
    {
        let fs = Arc::clone(&self.fs);
        let cfg = Arc::clone(&self.cfg);
        tokio::task::spawn_blocking(move || f(&Publisher::new(fs.as_ref(), &cfg)))
            .await
            .map_err(|e| anyhow!("publish task panicked: {e}"))?
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::RawConfigFile;

    fn generator(raw: RawConfigFile) -> SiteGenerator {
        SiteGenerator::from_config(Arc::new(ConfigFile::try_from(raw).unwrap())).unwrap()
    }

    fn raw_at(root: &str) -> RawConfigFile {
        let mut raw = RawConfigFile::default();
        raw.paths.root = Some(PathBuf::from(root));
        raw
    }

    #[test]
    fn build_arguments_follow_the_fixed_order() {
        let mut raw = raw_at("/p");
        raw.generator.program = Some("jekyll".into());
        raw.generator.extra_args = vec!["--trace".into()];
        let g = generator(raw);

        let inv = g.invocation(
            GeneratorMode::Build,
            GeneratorFlags {
                watch: true,
                incremental: true,
                drafts: true,
            },
            Path::new("/p/.sitepipe/staging"),
        );

        assert_eq!(inv.program, "jekyll");
        assert_eq!(
            inv.args,
            vec![
                "build",
                "--watch",
                "--incremental",
                "--drafts",
                "--trace",
                "--destination",
                "/p/.sitepipe/staging"
            ]
        );
        assert_eq!(inv.cwd, PathBuf::from("/p"));
    }

    #[test]
    fn disabled_flags_are_omitted() {
        let g = generator(raw_at("/p"));
        let inv = g.invocation(
            GeneratorMode::Serve,
            GeneratorFlags::default(),
            Path::new("/p/_site"),
        );
        assert_eq!(inv.args, vec!["serve", "--destination", "/p/_site"]);
    }

    #[test]
    fn defaults_match_the_classic_build() {
        let raw = RawConfigFile::default();
        let flags = GeneratorFlags::from_config(&raw.generator);
        assert!(flags.drafts && flags.incremental && !flags.watch);
    }
}
