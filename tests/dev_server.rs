// tests/dev_server.rs

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

use sitepipe::server::{self, ServerHandle, ServerOptions};
use sitepipe_test_utils::fixtures::write_file;
use sitepipe_test_utils::init_tracing;

fn start(site: &Path, live_reload: bool) -> ServerHandle {
    let local: SocketAddr = "127.0.0.1:0".parse().unwrap();
    server::start(ServerOptions {
        addr: local,
        site_dir: site.to_path_buf(),
        workers: 2,
        live_reload: live_reload.then_some(local),
        reload_debounce: Duration::from_millis(50),
    })
    .unwrap()
}

/// Send one request and return (status, body).
fn request(addr: SocketAddr, method: &str, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    write!(
        stream,
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
    )
    .unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).unwrap();
    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_file(root, "_site/index.html", "<html><body>home</body></html>");
    write_file(root, "_site/about/index.html", "<html><body>about</body></html>");
    write_file(root, "_site/contact.html", "<html><body>contact</body></html>");
    write_file(root, "_site/404.html", "<html><body>custom missing</body></html>");
    write_file(root, "_site/css/main.css", "body{color:red}");
    dir
}

#[test]
fn clean_urls_resolve_to_html_files() {
    init_tracing();
    let dir = site();
    let handle = start(&dir.path().join("_site"), false);
    let addr = handle.addr();

    assert_eq!(request(addr, "GET", "/"), (200, "<html><body>home</body></html>".into()));
    assert!(request(addr, "GET", "/about").1.contains("about"));
    assert!(request(addr, "GET", "/about/").1.contains("about"));
    assert!(request(addr, "GET", "/contact").1.contains("contact"));
    assert_eq!(request(addr, "GET", "/css/main.css").1, "body{color:red}");

    handle.shutdown();
}

#[test]
fn missing_pages_use_the_custom_404() {
    init_tracing();
    let dir = site();
    let handle = start(&dir.path().join("_site"), false);

    let (status, body) = request(handle.addr(), "GET", "/nope");
    assert_eq!(status, 404);
    assert!(body.contains("custom missing"));

    let (status, _) = request(handle.addr(), "GET", "/../secret");
    assert_eq!(status, 404);

    handle.shutdown();
}

#[test]
fn only_get_and_head_are_allowed() {
    init_tracing();
    let dir = site();
    let handle = start(&dir.path().join("_site"), false);

    assert_eq!(request(handle.addr(), "POST", "/").0, 405);
    let (status, body) = request(handle.addr(), "HEAD", "/");
    assert_eq!(status, 200);
    assert!(body.is_empty());

    handle.shutdown();
}

#[test]
fn html_gets_the_reload_script_when_live_reload_is_on() {
    init_tracing();
    let dir = site();
    let handle = start(&dir.path().join("_site"), true);
    let port = handle.live_reload().unwrap().addr().port();

    let (_, page) = request(handle.addr(), "GET", "/");
    assert!(page.contains("new WebSocket"));
    assert!(page.contains(&format!(":{port}/")));
    assert!(page.find("<script>").unwrap() < page.find("</body>").unwrap());

    let (_, css) = request(handle.addr(), "GET", "/css/main.css");
    assert!(!css.contains("WebSocket"));

    handle.shutdown();
}
