// src/exec/step_runner.rs

//! Individual build step runner.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::assets::{AssetCompiler, CompileReport};
use crate::build::{BuildStep, StepOutcome};
use crate::config::ConfigFile;
use crate::generator::{GeneratorFlags, SiteGenerator};
use crate::types::GeneratorMode;

/// Everything a step needs, shared by all dispatched steps.
#[derive(Debug)]
pub struct BuildContext {
    pub cfg: Arc<ConfigFile>,
    pub assets: AssetCompiler,
    pub generator: SiteGenerator,
    pub flags: GeneratorFlags,
}

impl BuildContext {
    pub fn new(cfg: Arc<ConfigFile>, assets: AssetCompiler, generator: SiteGenerator) -> Self {
        let flags = GeneratorFlags::from_config(&cfg.generator);
        Self {
            cfg,
            assets,
            generator,
            flags,
        }
    }

    /// Real filesystem, real tools.
    pub fn from_config(cfg: Arc<ConfigFile>) -> Result<Self> {
        let assets = AssetCompiler::from_config(Arc::clone(&cfg));
        let generator = SiteGenerator::from_config(Arc::clone(&cfg))?;
        Ok(Self::new(cfg, assets, generator))
    }
}

/// Run one step to completion.
///
/// Never fails: errors are logged and mapped to [`StepOutcome::Failed`], and
/// per-file compile problems to [`StepOutcome::Degraded`].
pub async fn run_step(step: BuildStep, ctx: &BuildContext) -> StepOutcome {
    info!(step = %step, "running step");
    let result = match step {
        BuildStep::Clean => run_clean(ctx).await,
        BuildStep::CompileScripts => {
            let assets = ctx.assets.clone();
            compile(step, move || assets.compile_scripts()).await
        }
        BuildStep::CompileStyles => {
            let assets = ctx.assets.clone();
            compile(step, move || assets.compile_styles()).await
        }
        BuildStep::Generate => run_generate(ctx).await,
    };

    match result {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(step = %step, error = %format!("{err:#}"), "step failed");
            StepOutcome::Failed(-1)
        }
    }
}

async fn run_clean(ctx: &BuildContext) -> Result<StepOutcome> {
    let assets = ctx.assets.clone();
    let removed = tokio::task::spawn_blocking(move || assets.clean())
        .await
        .context("clean task panicked")??;
    info!(removed = removed.len(), "clean finished");
    Ok(StepOutcome::Success)
}

async fn compile<F>(step: BuildStep, work: F) -> Result<StepOutcome>
where
    F: FnOnce() -> Result<CompileReport> + Send + 'static,
{
    let report = tokio::task::spawn_blocking(work)
        .await
        .with_context(|| format!("{step} task panicked"))??;

    for err in &report.errors {
        warn!(step = %step, "{err}");
    }
    info!(
        step = %step,
        written = report.written.len(),
        unchanged = report.unchanged.len(),
        errors = report.errors.len(),
        "compile finished"
    );

    if report.is_clean() {
        Ok(StepOutcome::Success)
    } else {
        Ok(StepOutcome::Degraded(report.errors.len()))
    }
}

async fn run_generate(ctx: &BuildContext) -> Result<StepOutcome> {
    let code = ctx.generator.run(GeneratorMode::Build, ctx.flags).await?;
    if code == 0 {
        Ok(StepOutcome::Success)
    } else {
        Ok(StepOutcome::Failed(code))
    }
}
