// src/config/model.rs

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::BuildSequence;

/// Top-level configuration as read from `Sitepipe.toml`.
///
/// Every section is optional; the defaults reproduce the classic layout of a
/// Jekyll blog with a `_scripts/` bundle and `_css/` style sheets:
///
/// ```toml
/// [paths]
/// site_dir = "_site"
///
/// [scripts]
/// sources = ["_scripts/*.js"]
/// libs = ["node_modules/linkjuice/dist/linkjuice.js"]
/// bundle = "js/bundle.min.js"
///
/// [styles]
/// sources = ["_css/**/*.{css,scss}"]
/// output_dir = "css"
///
/// [generator]
/// drafts = true
/// incremental = true
///
/// [serve]
/// port = 4000
///
/// [watch.subscriptions.posts]
/// patterns = ["_posts/**/*.{md,markdown,MD}"]
/// sequence = "rebuild"
/// ```
///
/// This is the raw, unvalidated form; see [`ConfigFile`] for the validated
/// path set the rest of the crate consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub generator: GeneratorSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Project root. Relative values are resolved against the directory of
    /// the config file; `None` means "that directory".
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Where the generator's output is published and served from.
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,

    /// Scratch directory the generator writes into before publishing.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

fn default_site_dir() -> PathBuf {
    PathBuf::from("_site")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(".sitepipe/staging")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            root: None,
            site_dir: default_site_dir(),
            staging_dir: default_staging_dir(),
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    /// Globs (relative to root) of the sources that get transformed.
    #[serde(default = "default_script_sources")]
    pub sources: Vec<String>,

    /// Library files prepended to the bundle unmodified, in order.
    #[serde(default = "default_script_libs")]
    pub libs: Vec<PathBuf>,

    /// Bundle output path.
    #[serde(default = "default_bundle")]
    pub bundle: PathBuf,

    /// Optional per-file transform command, fed the source on stdin.
    ///
    /// `{file}` and `{dir}` in arguments are replaced with the source path and
    /// its directory, e.g. `["npx", "babel", "--filename", "{file}"]`.
    #[serde(default)]
    pub transform: Option<Vec<String>>,

    /// Minify the concatenated bundle.
    #[serde(default = "default_true")]
    pub minify: bool,
}

fn default_script_sources() -> Vec<String> {
    vec!["_scripts/*.js".to_string()]
}

fn default_script_libs() -> Vec<PathBuf> {
    vec![PathBuf::from("node_modules/linkjuice/dist/linkjuice.js")]
}

fn default_bundle() -> PathBuf {
    PathBuf::from("js/bundle.min.js")
}

fn default_true() -> bool {
    true
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            sources: default_script_sources(),
            libs: default_script_libs(),
            bundle: default_bundle(),
            transform: None,
            minify: true,
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    #[serde(default = "default_style_sources")]
    pub sources: Vec<String>,

    #[serde(default = "default_style_output_dir")]
    pub output_dir: PathBuf,

    /// External compiler for `.scss` / `.sass` sources, fed on stdin.
    /// Supports the same `{file}` / `{dir}` placeholders as scripts.
    #[serde(default = "default_style_compiler")]
    pub compiler: Vec<String>,

    /// Compress every emitted sheet.
    #[serde(default = "default_true")]
    pub compress: bool,
}

fn default_style_sources() -> Vec<String> {
    vec!["_css/**/*.{css,scss}".to_string()]
}

fn default_style_output_dir() -> PathBuf {
    PathBuf::from("css")
}

fn default_style_compiler() -> Vec<String> {
    ["sass", "--stdin", "--style=compressed", "--no-source-map", "--load-path={dir}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            sources: default_style_sources(),
            output_dir: default_style_output_dir(),
            compiler: default_style_compiler(),
            compress: true,
        }
    }
}

/// `[generator]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorSection {
    /// Generator executable. Defaults to `jekyll` (`jekyll.bat` on Windows).
    #[serde(default)]
    pub program: Option<String>,

    /// Pass `--drafts`.
    #[serde(default = "default_true")]
    pub drafts: bool,

    /// Pass `--incremental`.
    #[serde(default = "default_true")]
    pub incremental: bool,

    /// Pass `--watch`. Only meaningful in serve mode.
    #[serde(default)]
    pub watch: bool,

    /// Extra arguments appended after the flags.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Flag used to point the generator at the staging directory.
    #[serde(default = "default_destination_flag")]
    pub destination_flag: String,

    /// Prefix for every logged output line.
    #[serde(default = "default_log_tag")]
    pub log_tag: String,

    /// Output lines matching this regex are logged at error level.
    #[serde(default = "default_error_pattern")]
    pub error_pattern: Option<String>,
}

fn default_destination_flag() -> String {
    "--destination".to_string()
}

fn default_log_tag() -> String {
    "Jekyll".to_string()
}

fn default_error_pattern() -> Option<String> {
    Some(r"(?i)\berror\b|liquid exception".to_string())
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            program: None,
            drafts: true,
            incremental: true,
            watch: false,
            extra_args: Vec::new(),
            destination_flag: default_destination_flag(),
            log_tag: default_log_tag(),
            error_pattern: default_error_pattern(),
        }
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_interface")]
    pub interface: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Inject the reload script and run the WebSocket endpoint.
    #[serde(default = "default_true")]
    pub live_reload: bool,

    #[serde(default = "default_live_reload_port")]
    pub live_reload_port: u16,

    /// Quiescence window for output-directory changes before clients reload.
    #[serde(default = "default_reload_debounce_ms")]
    pub reload_debounce_ms: u64,

    /// Number of HTTP worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_interface() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    4000
}

fn default_live_reload_port() -> u16 {
    35729
}

fn default_reload_debounce_ms() -> u64 {
    150
}

fn default_workers() -> usize {
    4
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            port: default_port(),
            live_reload: true,
            live_reload_port: default_live_reload_port(),
            reload_debounce_ms: default_reload_debounce_ms(),
            workers: default_workers(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiescence window after the last source event before a rebuild.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Exclusions applied to every subscription, on top of the generated
    /// outputs which are always excluded.
    #[serde(default = "default_watch_exclude")]
    pub exclude: Vec<String>,

    /// Skip batches whose matched files have unchanged content.
    #[serde(default)]
    pub use_hash: bool,

    /// Named categories. Declaring any subscription replaces the defaults.
    #[serde(default = "default_subscriptions")]
    pub subscriptions: BTreeMap<String, SubscriptionConfig>,
}

/// `[watch.subscriptions.<category>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub sequence: BuildSequence,
}

impl SubscriptionConfig {
    fn rebuild(patterns: &[&str]) -> Self {
        Self {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            sequence: BuildSequence::Rebuild,
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_watch_exclude() -> Vec<String> {
    ["node_modules/**", ".git/**", ".jekyll-cache/**", ".sass-cache/**"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_subscriptions() -> BTreeMap<String, SubscriptionConfig> {
    let mut subs = BTreeMap::new();
    subs.insert("config".into(), SubscriptionConfig::rebuild(&["_config.yml"]));
    subs.insert(
        "styles".into(),
        SubscriptionConfig::rebuild(&["_css/**/*.{css,scss}", "_sass/**/*.scss"]),
    );
    subs.insert("scripts".into(), SubscriptionConfig::rebuild(&["_scripts/**/*.js"]));
    subs.insert(
        "posts".into(),
        SubscriptionConfig::rebuild(&["_posts/**/*.{md,markdown,MD}"]),
    );
    subs.insert(
        "drafts".into(),
        SubscriptionConfig::rebuild(&["_drafts/*.{md,markdown,MD}"]),
    );
    subs.insert("templates".into(), SubscriptionConfig::rebuild(&["**/*.html"]));
    subs.insert(
        "markdown".into(),
        SubscriptionConfig::rebuild(&["**/*.{md,markdown,MD}"]),
    );
    subs.insert(
        "data".into(),
        SubscriptionConfig::rebuild(&["_data/**/*.{yml,yaml,csv,json}"]),
    );
    subs
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            exclude: default_watch_exclude(),
            use_hash: false,
            subscriptions: default_subscriptions(),
        }
    }
}

/// Validated configuration: the immutable path set shared by every
/// component.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `validate.rs`). All relative
/// paths are interpreted against [`ConfigFile::root`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub root: PathBuf,
    pub paths: PathsSection,
    pub scripts: ScriptsSection,
    pub styles: StylesSection,
    pub generator: GeneratorSection,
    pub serve: ServeSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(root: PathBuf, raw: RawConfigFile) -> Self {
        Self {
            root,
            paths: raw.paths,
            scripts: raw.scripts,
            styles: raw.styles,
            generator: raw.generator,
            serve: raw.serve,
            watch: raw.watch,
        }
    }

    /// Resolve a root-relative path.
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    pub fn site_dir(&self) -> PathBuf {
        self.resolve(&self.paths.site_dir)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.resolve(&self.paths.staging_dir)
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.resolve(&self.scripts.bundle)
    }

    pub fn styles_output_dir(&self) -> PathBuf {
        self.resolve(&self.styles.output_dir)
    }

    /// Effective generator executable.
    pub fn generator_program(&self) -> String {
        match &self.generator.program {
            Some(p) => p.clone(),
            None if cfg!(windows) => "jekyll.bat".to_string(),
            None => "jekyll".to_string(),
        }
    }

    /// Globs covering everything this tool writes, relative to root.
    ///
    /// These are excluded from every watch subscription so that a rebuild
    /// can never trigger itself.
    pub fn generated_excludes(&self) -> Vec<String> {
        let mut out = Vec::new();
        for dir in [
            &self.paths.site_dir,
            &self.paths.staging_dir,
            &self.styles.output_dir,
        ] {
            let dir = slash_path(dir);
            out.push(dir.clone());
            out.push(format!("{dir}/**"));
        }
        let retired = format!("{}.previous", slash_path(&self.paths.staging_dir));
        out.push(format!("{retired}/**"));
        out.push(retired);
        out.push(slash_path(&self.scripts.bundle));
        out
    }

    /// Where the previously published site is parked during a swap.
    pub fn retired_site_dir(&self) -> PathBuf {
        let mut name = self.staging_dir().into_os_string();
        name.push(".previous");
        PathBuf::from(name)
    }
}

/// Render a relative path with forward slashes, without a leading `./`.
pub(crate) fn slash_path(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    s.trim_start_matches("./").trim_end_matches('/').to_string()
}
