// src/assets/mod.rs

//! Asset compilation: the script bundle, compiled style sheets and the
//! `clean` step.
//!
//! Every operation is stateless per call. Per-file problems (a transpiler
//! error, an unparsable sheet) are collected into a [`CompileReport`] and
//! leave the previous output in place; only filesystem failures on the
//! output side surface as `Err`.

pub mod clean;
pub mod minify;
pub mod scripts;
pub mod sources;
pub mod styles;
pub mod transform;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ConfigFile;
use crate::fs::{FileSystem, RealFileSystem};

pub use transform::{ProcessToolRunner, ToolRunner};

/// A problem with one input or output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// What a compile call did to its outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub errors: Vec<CompileError>,
}

impl CompileReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: CompileReport) {
        self.written.extend(other.written);
        self.unchanged.extend(other.unchanged);
        self.errors.extend(other.errors);
    }

    pub(crate) fn record_output(&mut self, path: PathBuf, written: bool) {
        if written {
            self.written.push(path);
        } else {
            self.unchanged.push(path);
        }
    }

    pub(crate) fn record_error(&mut self, path: PathBuf, message: impl Into<String>) {
        self.errors.push(CompileError {
            path,
            message: message.into(),
        });
    }
}

/// Compiles assets for one project. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AssetCompiler {
    cfg: Arc<ConfigFile>,
    fs: Arc<dyn FileSystem>,
    tools: Arc<dyn ToolRunner>,
}

impl AssetCompiler {
    pub fn new(cfg: Arc<ConfigFile>, fs: Arc<dyn FileSystem>, tools: Arc<dyn ToolRunner>) -> Self {
        Self { cfg, fs, tools }
    }

    /// Real filesystem, real processes.
    pub fn from_config(cfg: Arc<ConfigFile>) -> Self {
        Self::new(cfg, Arc::new(RealFileSystem), Arc::new(ProcessToolRunner))
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    pub(crate) fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub(crate) fn tools(&self) -> &dyn ToolRunner {
        self.tools.as_ref()
    }
}
