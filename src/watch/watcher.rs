// src/watch/watcher.rs

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::debounce::Debouncer;
use crate::watch::event_handler::BatchHandler;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

/// Watch the handler's root recursively and send one
/// `RuntimeEvent::CycleRequested` per debounced batch that touches a
/// subscription.
pub fn spawn_watcher(
    handler: BatchHandler,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root: PathBuf = handler.root().to_path_buf();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watch loop gone; dropping notify event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), debounce_ms = debounce.as_millis() as u64, "file watcher started");

    let task = tokio::spawn(watch_loop(event_rx, handler, debounce, runtime_tx));

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}

async fn watch_loop(
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    mut handler: BatchHandler,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let mut debouncer = Debouncer::new(debounce);

    loop {
        let sleep = debouncer.sleep_duration(Instant::now());

        tokio::select! {
            maybe = event_rx.recv() => match maybe {
                Some(event) => debouncer.add_event(&event, Instant::now()),
                None => break,
            },
            _ = tokio::time::sleep(sleep) => {
                let Some(batch) = debouncer.take_if_ready(Instant::now()) else {
                    continue;
                };
                debug!(paths = batch.len(), "debounced batch ready");

                // Hashing reads files; keep it off the async workers.
                let joined = tokio::task::spawn_blocking(move || {
                    let steps = handler.handle(&batch);
                    (handler, steps)
                })
                .await;
                let steps = match joined {
                    Ok((h, steps)) => {
                        handler = h;
                        steps
                    }
                    Err(err) => {
                        error!(error = %err, "batch handler panicked; stopping watcher");
                        break;
                    }
                };

                let Some(steps) = steps else {
                    continue;
                };
                let event = RuntimeEvent::CycleRequested {
                    steps,
                    reason: TriggerReason::FileWatch,
                };
                if runtime_tx.send(event).await.is_err() {
                    debug!("runtime channel closed; stopping watcher");
                    break;
                }
            }
        }
    }
    debug!("watcher event loop finished");
}
