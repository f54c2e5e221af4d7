// src/lib.rs

pub mod assets;
pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod generator;
pub mod logging;
pub mod server;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::assets::sources::SourceGlob;
use crate::build::{StepGraph, StepSet};
use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, ConfigFile};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::{BuildContext, RealExecutorBackend};
use crate::fs::RealFileSystem;
use crate::generator::{GeneratorFlags, SiteGenerator};
use crate::types::GeneratorMode;
use crate::watch::{BatchHandler, SubscriptionSet, WatcherHandle};

/// Capacity of the watcher/executor -> runtime channel.
const RUNTIME_CHANNEL_CAPACITY: usize = 64;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (+ `--port` override)
/// - scheduler / pending cycle / runtime
/// - executor
/// - (optional) file watcher and dev server
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let command = args.command();
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?
        .with_port_override(args.port)?;

    if args.dry_run {
        print_dry_run(&cfg, &command)?;
        return Ok(());
    }

    let cfg = Arc::new(cfg);

    if let Command::Generate {
        mode: GeneratorMode::Serve,
    } = command
    {
        return run_generator_serve(cfg).await;
    }

    let ctx = Arc::new(BuildContext::from_config(Arc::clone(&cfg))?);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(RUNTIME_CHANNEL_CAPACITY);
    let executor = RealExecutorBackend::new(ctx, rt_tx.clone());

    // One-shot commands never watch.
    let _watcher = if command.is_one_shot() {
        None
    } else {
        Some(start_watcher(&cfg, rt_tx.clone()).await?)
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; shutting down");
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let initial = StepSet::from(command.initial_sequence());
    info!(command = ?command, steps = %initial, "starting");
    rt_tx
        .send(RuntimeEvent::CycleRequested {
            steps: initial,
            reason: TriggerReason::Manual,
        })
        .await
        .map_err(|_| anyhow!("runtime channel closed before start"))?;

    let options = RuntimeOptions {
        exit_when_idle: command.is_one_shot(),
        start_server: command.starts_server(),
    };
    let core = CoreRuntime::new(options);

    let mut runtime = Runtime::new(core, rt_rx, executor);
    if command.starts_server() {
        let server_cfg = Arc::clone(&cfg);
        runtime = runtime.with_server(Box::new(move || server::start_from_config(&server_cfg)));
    }

    runtime.run().await?;
    Ok(())
}

/// Build the subscription set, prime hashes if asked to, start watching.
async fn start_watcher(cfg: &ConfigFile, tx: mpsc::Sender<RuntimeEvent>) -> Result<WatcherHandle> {
    let subscriptions = SubscriptionSet::from_config(cfg)?;
    let mut handler = BatchHandler::new(cfg.root.clone(), subscriptions, cfg.watch.use_hash);

    if cfg.watch.use_hash {
        handler = tokio::task::spawn_blocking(move || -> Result<BatchHandler> {
            handler.prime(&RealFileSystem)?;
            Ok(handler)
        })
        .await
        .context("hash priming task panicked")??;
    }

    watch::spawn_watcher(handler, Duration::from_millis(cfg.watch.debounce_ms), tx)
}

/// `generate --mode serve`: the generator serves (and usually watches) by
/// itself until it exits or Ctrl-C.
async fn run_generator_serve(cfg: Arc<ConfigFile>) -> Result<()> {
    let generator = SiteGenerator::from_config(Arc::clone(&cfg))?;
    let flags = GeneratorFlags::from_config(&cfg.generator);

    tokio::select! {
        code = generator.run(GeneratorMode::Serve, flags) => {
            let code = code?;
            if code != 0 {
                return Err(errors::SitepipeError::BuildFailed(format!(
                    "generator exited with code {code}"
                ))
                .into());
            }
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received; stopping generator");
            Ok(())
        }
    }
}

fn print_source_globs(patterns: &[String]) -> Result<()> {
    println!("  sources:");
    for pattern in patterns {
        let glob = SourceGlob::new(pattern)?;
        println!("    {} (under {})", glob.pattern(), glob.base().display());
    }
    Ok(())
}

/// Dry-run output: resolved configuration and what the command would do.
fn print_dry_run(cfg: &ConfigFile, command: &Command) -> Result<()> {
    println!("sitepipe dry-run");
    println!("  root = {}", cfg.root.display());
    println!("  site_dir = {}", cfg.site_dir().display());
    println!("  staging_dir = {}", cfg.staging_dir().display());
    println!();

    println!("scripts:");
    print_source_globs(&cfg.scripts.sources)?;
    if !cfg.scripts.libs.is_empty() {
        println!("  libs: {:?}", cfg.scripts.libs);
    }
    if let Some(ref transform) = cfg.scripts.transform {
        println!("  transform: {}", transform.join(" "));
    }
    println!("  bundle: {} (minify: {})", cfg.bundle_path().display(), cfg.scripts.minify);
    println!();

    println!("styles:");
    print_source_globs(&cfg.styles.sources)?;
    println!("  compiler: {}", cfg.styles.compiler.join(" "));
    println!(
        "  output_dir: {} (compress: {})",
        cfg.styles_output_dir().display(),
        cfg.styles.compress
    );
    println!();

    let generator = SiteGenerator::from_config(Arc::new(cfg.clone()))?;
    let flags = GeneratorFlags::from_config(&cfg.generator);
    let (mode, dest) = match command {
        Command::Generate {
            mode: GeneratorMode::Serve,
        } => (GeneratorMode::Serve, cfg.site_dir()),
        _ => (GeneratorMode::Build, cfg.staging_dir()),
    };
    println!("generator:");
    println!("  {}", generator.invocation(mode, flags, &dest).display());
    println!();

    println!("command: {command:?}");
    let initial = StepSet::from(command.initial_sequence());
    let order: Vec<&str> = StepGraph::new()
        .ordered(&initial)
        .iter()
        .map(|s| s.name())
        .collect();
    println!("  steps: {}", order.join(" -> "));
    println!("  exits when done: {}", command.is_one_shot());

    if command.starts_server() {
        let serve = &cfg.serve;
        println!("  serve: http://{}:{}", serve.interface, serve.port);
        if serve.live_reload {
            println!("  live reload: ws://{}:{}", serve.interface, serve.live_reload_port);
        }
    }

    if !command.is_one_shot() {
        println!();
        println!("watch (debounce {} ms, use_hash {}):", cfg.watch.debounce_ms, cfg.watch.use_hash);
        for (name, sub) in &cfg.watch.subscriptions {
            println!("  - {name} -> {:?}", sub.sequence);
            println!("      patterns: {:?}", sub.patterns);
            if !sub.exclude.is_empty() {
                println!("      exclude: {:?}", sub.exclude);
            }
        }
        println!("  exclude: {:?}", cfg.watch.exclude);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
