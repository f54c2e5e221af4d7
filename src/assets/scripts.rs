// src/assets/scripts.rs

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::assets::minify::minify_js;
use crate::assets::sources::collect_sources;
use crate::assets::transform::expand_placeholders;
use crate::assets::{AssetCompiler, CompileReport};
use crate::fs::write_if_changed;

impl AssetCompiler {
    /// Build the script bundle.
    ///
    /// Libraries come first, untouched, followed by every matched source
    /// (sorted) after the optional transform. Parts are joined with `\n`.
    /// If any input fails, nothing is written and the previous bundle stays.
    pub fn compile_scripts(&self) -> Result<CompileReport> {
        let cfg = self.config();
        let fs = self.fs();
        let bundle_path = cfg.bundle_path();
        let mut report = CompileReport::default();

        let sources = collect_sources(fs, &cfg.root, &cfg.scripts.sources)?;
        if sources.is_empty() && cfg.scripts.libs.is_empty() {
            debug!("no script sources matched; skipping bundle");
            return Ok(report);
        }

        let mut parts: Vec<String> = Vec::with_capacity(cfg.scripts.libs.len() + sources.len());

        for lib in &cfg.scripts.libs {
            let path = cfg.resolve(lib);
            match fs.read_to_string(&path) {
                Ok(text) => parts.push(text),
                Err(err) => report.record_error(path, format!("{err:#}")),
            }
        }

        for source in &sources {
            let text = match fs.read_to_string(&source.path) {
                Ok(text) => text,
                Err(err) => {
                    report.record_error(source.path.clone(), format!("{err:#}"));
                    continue;
                }
            };

            let Some(argv) = &cfg.scripts.transform else {
                parts.push(text);
                continue;
            };

            let argv = expand_placeholders(argv, &source.path);
            match self.tools().run(&argv, &cfg.root, text.as_bytes()) {
                Ok(out) => parts.push(String::from_utf8_lossy(&out).into_owned()),
                Err(err) => report.record_error(source.path.clone(), format!("{err:#}")),
            }
        }

        if !report.is_clean() {
            for err in &report.errors {
                warn!(file = %err.path.display(), "script error: {}", err.message);
            }
            warn!(
                bundle = %bundle_path.display(),
                errors = report.errors.len(),
                "keeping previous bundle"
            );
            return Ok(report);
        }

        let mut bundle = parts.join("\n");
        if cfg.scripts.minify {
            match minify_js(&bundle) {
                Ok(min) => bundle = min,
                Err(msg) => {
                    warn!(bundle = %bundle_path.display(), "minification failed: {msg}");
                    report.record_error(bundle_path, format!("minification failed: {msg}"));
                    return Ok(report);
                }
            }
        }

        let written = write_if_changed(fs, &bundle_path, bundle.as_bytes())?;
        if written {
            info!(
                bundle = %bundle_path.display(),
                inputs = parts.len(),
                bytes = bundle.len(),
                "wrote script bundle"
            );
        } else {
            debug!(bundle = %bundle_path.display(), "script bundle unchanged");
        }
        report.record_output(bundle_path, written);
        Ok(report)
    }
}
