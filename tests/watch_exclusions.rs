// tests/watch_exclusions.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use sitepipe::build::{BuildStep, StepSet};
use sitepipe::config::ConfigFile;
use sitepipe::engine::{RuntimeEvent, TriggerReason};
use sitepipe::types::BuildSequence;
use sitepipe::watch::{spawn_watcher, BatchHandler, ChangeKind, SubscriptionSet};
use sitepipe_test_utils::builders::ConfigFileBuilder;
use sitepipe_test_utils::fixtures::{blog_sources, write_file};
use sitepipe_test_utils::{init_tracing, with_timeout};

fn handler(cfg: &ConfigFile) -> BatchHandler {
    let subs = SubscriptionSet::from_config(cfg).unwrap();
    BatchHandler::new(cfg.root.clone(), subs, cfg.watch.use_hash)
}

fn batch(root: &Path, rels: &[&str]) -> HashMap<PathBuf, ChangeKind> {
    rels.iter()
        .map(|rel| (root.join(rel), ChangeKind::Modified))
        .collect()
}

#[test]
fn generated_outputs_never_trigger_a_build() {
    let root = PathBuf::from("/p");
    let cfg = ConfigFileBuilder::new(&root)
        .with_default_subscriptions()
        .build();
    let mut h = handler(&cfg);

    for rel in [
        "_site/index.html",
        "_site/2024/01/01/hello.html",
        "_site/notes.md",
        ".sitepipe/staging/index.html",
        ".sitepipe/staging.previous/index.html",
        "css/main.css",
        "js/bundle.min.js",
    ] {
        assert_eq!(h.handle(&batch(&root, &[rel])), None, "{rel} should be ignored");
    }
}

#[test]
fn sources_trigger_a_rebuild_even_next_to_outputs() {
    let root = PathBuf::from("/p");
    let cfg = ConfigFileBuilder::new(&root)
        .with_default_subscriptions()
        .build();
    let mut h = handler(&cfg);

    let steps = h
        .handle(&batch(&root, &["_site/index.html", "_posts/2024-01-01-hello.md"]))
        .unwrap();
    assert_eq!(steps, StepSet::from(BuildSequence::Rebuild));
    assert!(!steps.contains(BuildStep::Clean));
}

#[test]
fn editor_temp_files_are_ignored() {
    let root = PathBuf::from("/p");
    let cfg = ConfigFileBuilder::new(&root)
        .with_default_subscriptions()
        .build();
    let mut h = handler(&cfg);

    assert_eq!(
        h.handle(&batch(&root, &["_posts/.hello.md.swp", "_posts/hello.md~"])),
        None
    );
}

#[tokio::test]
async fn a_burst_of_saves_requests_one_cycle() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    blog_sources(&root);

    let cfg = ConfigFileBuilder::new(&root)
        .with_subscription("posts", &["_posts/**/*.md"], BuildSequence::Generate)
        .with_subscription("scripts", &["_scripts/*.js"], BuildSequence::Compile)
        .with_debounce_ms(200)
        .build();

    let (tx, mut rx) = mpsc::channel(16);
    let watcher = spawn_watcher(handler(&cfg), Duration::from_millis(cfg.watch.debounce_ms), tx).unwrap();

    for i in 0..5 {
        write_file(&root, "_posts/2024-01-01-hello.md", &format!("# edit {i}"));
        write_file(&root, "_scripts/a.js", &format!("var a = {i};"));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // Output writes during the burst must not add anything.
    write_file(&root, "_site/index.html", "<html></html>");

    let event = with_timeout(rx.recv()).await.unwrap();
    match event {
        RuntimeEvent::CycleRequested { steps, reason } => {
            assert_eq!(reason, TriggerReason::FileWatch);
            let mut expected = StepSet::from(BuildSequence::Generate);
            expected.merge(&StepSet::from(BuildSequence::Compile));
            assert_eq!(steps, expected);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let second = tokio::time::timeout(Duration::from_millis(800), rx.recv()).await;
    assert!(second.is_err(), "expected a single request, got {second:?}");

    watcher.stop();
}
