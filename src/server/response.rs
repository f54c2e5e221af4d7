// src/server/response.rs

//! HTTP response handlers.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::mime;
use super::resolve::not_found_page;

/// Respond with a file from the site, injecting the reload script into HTML.
pub fn respond_file(request: Request, path: &Path, reload_port: Option<u16>) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let body = maybe_inject_reload(body, content_type, reload_port);
    send_body(request, 200, content_type, body)
}

/// Respond with the site's `404.html`, or a plain 404.
pub fn respond_not_found(request: Request, site_dir: &Path, reload_port: Option<u16>) -> Result<()> {
    let custom = not_found_page(site_dir);

    if is_head_request(&request) {
        let content_type = if custom.is_some() { mime::HTML } else { mime::PLAIN };
        return send_head(request, 404, content_type);
    }

    if let Some(page) = custom
        && let Ok(body) = fs::read(&page)
    {
        let body = maybe_inject_reload(body, mime::HTML, reload_port);
        return send_body(request, 404, mime::HTML, body);
    }

    send_body(request, 404, mime::PLAIN, b"404 Not Found".to_vec())
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(make_header("Content-Type", mime::PLAIN)?)
        .with_header(make_header("Allow", "GET, HEAD")?);
    request.respond(response)?;
    Ok(())
}

pub fn is_allowed_method(method: &Method) -> bool {
    matches!(method, Method::Get | Method::Head)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes())
        .map_err(|_| anyhow!("invalid header {key}: {value}"))
}

/// Inject the reload client when serving HTML with live reload on.
pub fn maybe_inject_reload(body: Vec<u8>, content_type: &str, reload_port: Option<u16>) -> Vec<u8> {
    match (content_type.starts_with("text/html"), reload_port) {
        (true, Some(port)) => inject_reload_script(&body, port),
        _ => body,
    }
}

/// Small client that reloads the page on a `reload` message.
pub fn reload_script(port: u16) -> String {
    format!(
        "<script>(function(){{\
var s=new WebSocket((location.protocol==='https:'?'wss://':'ws://')+location.hostname+':{port}/');\
s.onmessage=function(e){{if(e.data==='reload'){{location.reload();}}}};\
}})();</script>"
    )
}

/// Insert the reload script before the last `</body>`, or append it.
pub fn inject_reload_script(content: &[u8], port: u16) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let script = reload_script(port);
    let script = script.as_bytes();
    let mut result = Vec::with_capacity(content.len() + script.len());

    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script);
        }
    }
    result
}
