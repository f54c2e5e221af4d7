#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sitepipe::config::{ConfigFile, RawConfigFile, SubscriptionConfig};
use sitepipe::types::BuildSequence;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with no script libraries, no
/// minification or compression and no subscriptions, so tests only see what
/// they add.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let mut config = RawConfigFile::default();
        config.paths.root = Some(root.as_ref().to_path_buf());
        config.scripts.libs.clear();
        config.scripts.minify = false;
        config.styles.compress = false;
        config.watch.subscriptions.clear();
        Self { config }
    }

    pub fn with_site_dir(mut self, rel: &str) -> Self {
        self.config.paths.site_dir = PathBuf::from(rel);
        self
    }

    pub fn with_script_lib(mut self, path: &str) -> Self {
        self.config.scripts.libs.push(PathBuf::from(path));
        self
    }

    pub fn with_script_sources(mut self, patterns: &[&str]) -> Self {
        self.config.scripts.sources = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_minify(mut self, val: bool) -> Self {
        self.config.scripts.minify = val;
        self
    }

    pub fn with_style_sources(mut self, patterns: &[&str]) -> Self {
        self.config.styles.sources = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_compress(mut self, val: bool) -> Self {
        self.config.styles.compress = val;
        self
    }

    pub fn with_style_compiler(mut self, argv: &[&str]) -> Self {
        self.config.styles.compiler = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_generator(mut self, program: impl Into<String>) -> Self {
        self.config.generator.program = Some(program.into());
        self
    }

    pub fn with_incremental(mut self, val: bool) -> Self {
        self.config.generator.incremental = val;
        self
    }

    pub fn with_subscription(mut self, name: &str, patterns: &[&str], sequence: BuildSequence) -> Self {
        self.config.watch.subscriptions.insert(
            name.to_string(),
            SubscriptionConfig {
                patterns: patterns.iter().map(|s| s.to_string()).collect(),
                exclude: Vec::new(),
                sequence,
            },
        );
        self
    }

    pub fn with_default_subscriptions(mut self) -> Self {
        self.config.watch.subscriptions = RawConfigFile::default().watch.subscriptions;
        self
    }

    pub fn with_use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
