// src/assets/styles.rs

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::assets::minify::minify_css;
use crate::assets::sources::{SourceFile, SourceGlob};
use crate::assets::transform::expand_placeholders;
use crate::assets::{AssetCompiler, CompileReport};
use crate::fs::write_if_changed;

/// How a style source is turned into CSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleKind {
    Plain,
    Preprocessed,
}

fn style_kind(path: &Path) -> Option<StyleKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("css") => Some(StyleKind::Plain),
        Some("scss") | Some("sass") => Some(StyleKind::Preprocessed),
        _ => None,
    }
}

/// Partials are only pulled in by other sheets.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

impl AssetCompiler {
    /// Compile every matched style sheet into `output_dir`.
    ///
    /// `_css/blog/post.scss` with base `_css` lands at
    /// `<output_dir>/blog/post.css`. A sheet that fails keeps its previous
    /// output; the others are still written.
    pub fn compile_styles(&self) -> Result<CompileReport> {
        let cfg = self.config();
        let out_dir = cfg.styles_output_dir();
        let mut report = CompileReport::default();

        for pattern in &cfg.styles.sources {
            let glob = SourceGlob::new(pattern)?;
            for source in glob.collect(self.fs(), &cfg.root)? {
                let Some(kind) = style_kind(&source.path) else {
                    debug!(file = %source.path.display(), "not a style sheet; skipping");
                    continue;
                };
                if is_partial(&source.path) {
                    continue;
                }

                let target = out_dir.join(&source.within_base).with_extension("css");
                match self.render_sheet(&source, kind) {
                    Ok(css) => {
                        let written = write_if_changed(self.fs(), &target, css.as_bytes())?;
                        if written {
                            info!(
                                source = %source.path.display(),
                                output = %target.display(),
                                "compiled style sheet"
                            );
                        }
                        report.record_output(target, written);
                    }
                    Err(msg) => {
                        warn!(
                            file = %source.path.display(),
                            output = %target.display(),
                            "style error, keeping previous output: {msg}"
                        );
                        report.record_error(source.path.clone(), msg);
                    }
                }
            }
        }

        Ok(report)
    }

    fn render_sheet(&self, source: &SourceFile, kind: StyleKind) -> Result<String, String> {
        let cfg = self.config();
        let text = self
            .fs()
            .read_to_string(&source.path)
            .map_err(|e| format!("{e:#}"))?;

        let css = match kind {
            StyleKind::Plain => text,
            StyleKind::Preprocessed => {
                if cfg.styles.compiler.is_empty() {
                    return Err("no style compiler configured for preprocessor sources".into());
                }
                let argv = expand_placeholders(&cfg.styles.compiler, &source.path);
                let out = self
                    .tools()
                    .run(&argv, &cfg.root, text.as_bytes())
                    .map_err(|e| format!("{e:#}"))?;
                String::from_utf8_lossy(&out).into_owned()
            }
        };

        if cfg.styles.compress {
            minify_css(&css).map_err(|e| format!("compression failed: {e}"))
        } else {
            Ok(css)
        }
    }
}
