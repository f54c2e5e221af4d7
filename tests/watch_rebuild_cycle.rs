// tests/watch_rebuild_cycle.rs
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sitepipe::build::StepSet;
use sitepipe::config::ConfigFile;
use sitepipe::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use sitepipe::exec::{BuildContext, RealExecutorBackend};
use sitepipe::types::BuildSequence;
use sitepipe::watch::{spawn_watcher, BatchHandler, SubscriptionSet};
use sitepipe_test_utils::builders::ConfigFileBuilder;
use sitepipe_test_utils::fixtures::{blog_sources, fake_generator, write_file};
use sitepipe_test_utils::{init_tracing, with_timeout};

fn generator_runs(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

async fn wait_for_runs(log: &Path, n: usize) {
    with_timeout(async {
        while generator_runs(log).len() < n {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}

fn project(root: &Path) -> ConfigFile {
    blog_sources(root);
    let bin = root.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let script = fake_generator(&bin, "page", 0);

    ConfigFileBuilder::new(root)
        .with_generator(script.to_string_lossy())
        .with_style_sources(&["_css/**/*.css"])
        .with_default_subscriptions()
        .with_debounce_ms(200)
        .build()
}

#[tokio::test]
async fn one_script_save_runs_the_generator_once() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let cfg = Arc::new(project(&root));
    let log = root.join("bin/args.log");

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let ctx = Arc::new(BuildContext::from_config(Arc::clone(&cfg)).unwrap());
    let executor = RealExecutorBackend::new(ctx, tx.clone());

    let subs = SubscriptionSet::from_config(&cfg).unwrap();
    let handler = BatchHandler::new(cfg.root.clone(), subs, false);
    let watcher = spawn_watcher(
        handler,
        Duration::from_millis(cfg.watch.debounce_ms),
        tx.clone(),
    )
    .unwrap();

    tx.send(RuntimeEvent::CycleRequested {
        steps: StepSet::from(BuildSequence::Full),
        reason: TriggerReason::Manual,
    })
    .await
    .unwrap();

    let runtime = Runtime::new(CoreRuntime::new(RuntimeOptions::default()), rx, executor);
    let handle = tokio::spawn(runtime.run());

    // Initial build; its own writes (site, css, bundle) must not loop.
    wait_for_runs(&log, 1).await;
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(generator_runs(&log).len(), 1);
    assert!(root.join("_site/index.html").is_file());

    write_file(&root, "_scripts/a.js", "var edited = 42;");

    wait_for_runs(&log, 2).await;
    tokio::time::sleep(Duration::from_millis(800)).await;
    let runs = generator_runs(&log);
    assert_eq!(runs.len(), 2, "generator runs: {runs:?}");
    assert!(runs[1].starts_with("build"));

    let bundle = fs::read_to_string(root.join("js/bundle.min.js")).unwrap();
    assert!(bundle.contains("edited"));

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(handle).await.unwrap().unwrap();
    watcher.stop();
}
