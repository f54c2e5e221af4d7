// src/server/mod.rs

//! Development server: static files from the site directory with clean URLs
//! and live reload.
//!
//! Runs on plain threads (a `tiny_http` worker pool plus the live reload
//! threads) next to the async runtime, and only ever reads the site
//! directory.

pub mod mime;
pub mod reload;
pub mod resolve;
pub mod response;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Request, Server};
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, SitepipeError};

pub use reload::{LiveReload, ReloadHub, RELOAD_MESSAGE};
pub use resolve::resolve_path;

/// Settings the server needs, taken from `[serve]` and `[paths]`.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub addr: SocketAddr,
    pub site_dir: PathBuf,
    pub workers: usize,
    /// `None` disables script injection and the WebSocket endpoint.
    pub live_reload: Option<SocketAddr>,
    pub reload_debounce: Duration,
}

impl ServerOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let serve = &cfg.serve;
        Self {
            addr: SocketAddr::new(serve.interface, serve.port),
            site_dir: cfg.site_dir(),
            workers: serve.workers.max(1),
            live_reload: serve
                .live_reload
                .then(|| SocketAddr::new(serve.interface, serve.live_reload_port)),
            reload_debounce: Duration::from_millis(serve.reload_debounce_ms),
        }
    }
}

/// A running dev server. Stopped by [`ServerHandle::shutdown`] or on drop.
pub struct ServerHandle {
    addr: SocketAddr,
    http: Arc<Server>,
    workers: Vec<JoinHandle<()>>,
    live_reload: Option<LiveReload>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .field("workers", &self.workers.len())
            .field("live_reload", &self.live_reload)
            .finish()
    }
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn live_reload(&self) -> Option<&LiveReload> {
        self.live_reload.as_ref()
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        for _ in 0..self.workers.len() {
            self.http.unblock();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        if let Some(live) = self.live_reload.take() {
            live.shutdown();
        }
        debug!(addr = %self.addr, "dev server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

/// Bind the HTTP port (and the live reload port) and start serving.
pub fn start(options: ServerOptions) -> Result<ServerHandle> {
    let http = Server::http(options.addr)
        .map_err(|e| SitepipeError::Server(format!("binding {}: {e}", options.addr)))?;
    let addr = http
        .server_addr()
        .to_ip()
        .ok_or_else(|| SitepipeError::Server("server is not bound to an IP address".into()))?;
    let http = Arc::new(http);

    let live_reload = match options.live_reload {
        Some(ws_addr) => Some(
            LiveReload::start(ws_addr, &options.site_dir, options.reload_debounce)
                .map_err(|e| SitepipeError::Server(format!("{e:#}")))?,
        ),
        None => None,
    };
    let reload_port = live_reload.as_ref().map(|l| l.addr().port());

    let site_dir = Arc::new(options.site_dir);
    let mut workers = Vec::with_capacity(options.workers);
    for i in 0..options.workers {
        let http = Arc::clone(&http);
        let site_dir = Arc::clone(&site_dir);
        let worker = thread::Builder::new()
            .name(format!("sitepipe-http-{i}"))
            .spawn(move || {
                for request in http.incoming_requests() {
                    if let Err(err) = handle_request(request, &site_dir, reload_port) {
                        warn!(error = %format!("{err:#}"), "request failed");
                    }
                }
            })?;
        workers.push(worker);
    }

    info!(%addr, site = %site_dir.display(), workers = workers.len(), "serving site");
    Ok(ServerHandle {
        addr,
        http,
        workers,
        live_reload,
    })
}

/// Start from the validated configuration.
pub fn start_from_config(cfg: &ConfigFile) -> Result<ServerHandle> {
    start(ServerOptions::from_config(cfg))
}

fn handle_request(request: Request, site_dir: &Path, reload_port: Option<u16>) -> anyhow::Result<()> {
    debug!(method = %request.method(), url = %request.url(), "request");

    if !response::is_allowed_method(request.method()) {
        return response::respond_method_not_allowed(request);
    }

    match resolve_path(request.url(), site_dir) {
        Some(path) => response::respond_file(request, &path, reload_port),
        None => response::respond_not_found(request, site_dir, reload_port),
    }
}
