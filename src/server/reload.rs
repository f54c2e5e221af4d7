// src/server/reload.rs

//! Live reload: a WebSocket endpoint plus a watcher on the site directory.
//!
//! The watcher only looks at published output. When the directory settles
//! (no events for `reload_debounce_ms`) every connected client gets a
//! `reload` text message.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

use crate::watch::Debouncer;

pub const RELOAD_MESSAGE: &str = "reload";

/// Connected live-reload clients.
#[derive(Debug, Clone, Default)]
pub struct ReloadHub {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WebSocket<TcpStream>>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Complete the handshake and register the client.
    pub fn add_client(&self, stream: TcpStream) {
        match tungstenite::accept(stream) {
            Ok(ws) => {
                let mut clients = self.lock();
                clients.push(ws);
                debug!(total = clients.len(), "live reload client connected");
            }
            Err(err) => debug!(error = %err, "websocket handshake failed"),
        }
    }

    /// Send `text` to every client, dropping the ones that are gone.
    pub fn broadcast(&self, text: &str) -> usize {
        let mut clients = self.lock();
        clients.retain_mut(|ws| {
            ws.send(Message::Text(text.to_string().into()))
                .map_err(|err| debug!(error = %err, "dropping live reload client"))
                .is_ok()
        });
        clients.len()
    }

    pub fn close_all(&self) {
        for mut ws in self.lock().drain(..) {
            let _ = ws.close(None);
        }
    }
}

/// The WebSocket listener thread and the site watcher thread.
pub struct LiveReload {
    hub: ReloadHub,
    addr: SocketAddr,
    stopping: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
    notify_thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LiveReload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveReload")
            .field("addr", &self.addr)
            .field("clients", &self.hub.client_count())
            .finish_non_exhaustive()
    }
}

impl LiveReload {
    /// Bind the WebSocket port and start watching `site_dir`.
    pub fn start(addr: SocketAddr, site_dir: &Path, debounce: Duration) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).with_context(|| format!("binding live reload port {addr}"))?;
        let addr = listener.local_addr()?;
        let hub = ReloadHub::new();
        let stopping = Arc::new(AtomicBool::new(false));

        let accept_thread = {
            let hub = hub.clone();
            let stopping = Arc::clone(&stopping);
            thread::Builder::new()
                .name("sitepipe-reload-accept".into())
                .spawn(move || accept_loop(listener, hub, stopping))?
        };

        let (watcher, notify_thread) = watch_site(site_dir, debounce, hub.clone())?;
        info!(%addr, site = %site_dir.display(), "live reload ready");

        Ok(Self {
            hub,
            addr,
            stopping,
            accept_thread: Some(accept_thread),
            watcher: Some(watcher),
            notify_thread: Some(notify_thread),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Wake the blocking accept.
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        // Dropping the watcher closes the event channel and ends the thread.
        self.watcher.take();
        if let Some(handle) = self.notify_thread.take() {
            let _ = handle.join();
        }
        self.hub.close_all();
    }
}

impl Drop for LiveReload {
    fn drop(&mut self) {
        if self.accept_thread.is_some() {
            self.stop();
        }
    }
}

fn accept_loop(listener: TcpListener, hub: ReloadHub, stopping: Arc<AtomicBool>) {
    for stream in listener.incoming() {
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => hub.add_client(stream),
            Err(err) => warn!(error = %err, "live reload accept failed"),
        }
    }
    debug!("live reload listener stopped");
}

/// Watch the site directory's parent so the directory swap on publish is
/// seen, and keep only events under the site directory itself.
fn watch_site(
    site_dir: &Path,
    debounce: Duration,
    hub: ReloadHub,
) -> Result<(RecommendedWatcher, JoinHandle<()>)> {
    let (site, parent) = watch_target(site_dir)?;
    let (tx, rx) = mpsc::channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(err) => warn!(error = %err, "site watch error"),
        },
        Config::default(),
    )?;
    watcher.watch(&parent, RecursiveMode::Recursive)?;

    let handle = thread::Builder::new()
        .name("sitepipe-reload-watch".into())
        .spawn(move || reload_loop(rx, &site, debounce, &hub))?;
    Ok((watcher, handle))
}

fn watch_target(site_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let name = site_dir
        .file_name()
        .with_context(|| format!("site dir {} has no name", site_dir.display()))?;
    let parent = site_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("creating {}", parent.display()))?;
    let parent = parent
        .canonicalize()
        .with_context(|| format!("resolving {}", parent.display()))?;
    Ok((parent.join(name), parent))
}

fn reload_loop(rx: mpsc::Receiver<Event>, site: &Path, debounce: Duration, hub: &ReloadHub) {
    let mut debouncer = Debouncer::new(debounce);
    loop {
        let wait = debouncer.sleep_duration(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(mut event) => {
                event.paths.retain(|p| is_within(site, p));
                if !event.paths.is_empty() {
                    debouncer.add_event(&event, Instant::now());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if let Some(batch) = debouncer.take_if_ready(Instant::now()) {
            let clients = hub.broadcast(RELOAD_MESSAGE);
            info!(changed = batch.len(), clients, "site changed; reloading browsers");
        }
    }
    debug!("site watcher stopped");
}

fn is_within(site: &Path, path: &Path) -> bool {
    path == site || path.starts_with(site)
}
