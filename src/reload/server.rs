// src/reload/server.rs

//! Static HTTP server over the build root.

use std::net::{IpAddr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::fs::FileSystem;

const MAX_PORT_RETRIES: u16 = 10;

const HTML: &str = "text/html; charset=utf-8";

/// Handle to the running HTTP server.
pub struct StaticServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

impl std::fmt::Debug for StaticServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticServer").field("addr", &self.addr).finish()
    }
}

impl StaticServer {
    /// Serve `root` on `host:base_port` (or the next free port) from a
    /// background thread. HTML responses get the reload client for
    /// `reload_port`.
    pub fn start(
        host: IpAddr,
        base_port: u16,
        root: PathBuf,
        fs: Arc<dyn FileSystem>,
        reload_port: u16,
    ) -> Result<Self> {
        let (server, addr) = bind_with_retry(host, base_port)?;
        let server = Arc::new(server);

        let worker = Arc::clone(&server);
        thread::Builder::new()
            .name("static-server".to_string())
            .spawn(move || {
                for request in worker.incoming_requests() {
                    if let Err(e) = respond(request, &root, fs.as_ref(), reload_port) {
                        warn!(error = %e, "failed to answer request");
                    }
                }
                debug!("static server stopped");
            })?;

        Ok(Self { server, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// Bind to `host:base_port`, moving up one port at a time while taken.
pub fn bind_with_retry(host: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = String::new();

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http(SocketAddr::new(host, port)) {
            Ok(server) => {
                let addr = server
                    .server_addr()
                    .to_ip()
                    .unwrap_or_else(|| SocketAddr::new(host, port));
                if offset > 0 {
                    info!(requested = base_port, actual = addr.port(), "port in use; using next free port");
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error
    ))
}

fn respond(request: Request, root: &Path, fs: &dyn FileSystem, reload_port: u16) -> Result<()> {
    let url = request.url().to_string();
    let Some(path) = resolve_request_path(root, &url, fs) else {
        debug!(url = %url, "not found");
        let body = inject_reload_script(
            b"<html><body><h1>404 Not Found</h1></body></html>".to_vec(),
            reload_port,
        );
        return send(request, 404, HTML, body);
    };

    let content_type = content_type_for(&path);
    let body = fs.read(&path)?;
    let body = if content_type == HTML {
        inject_reload_script(body, reload_port)
    } else {
        body
    };
    send(request, 200, content_type, body)
}

fn send(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let header = Header::from_bytes("Content-Type", content_type)
        .map_err(|()| anyhow!("invalid content type '{content_type}'"))?;
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header);
    request.respond(response)?;
    Ok(())
}

/// Map a request URL onto a file under `root`.
///
/// Query strings are ignored, `..` components are rejected and directories
/// resolve to their `index.html`.
pub fn resolve_request_path(root: &Path, url: &str, fs: &dyn FileSystem) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let rel = Path::new(path.trim_start_matches('/'));

    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let candidate = root.join(rel);
    if fs.is_file(&candidate) {
        return Some(candidate);
    }
    let index = candidate.join("index.html");
    fs.is_file(&index).then_some(index)
}

/// Content type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => HTML,
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "map" | "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}

fn reload_script(reload_port: u16) -> String {
    format!(
        "<script>(function(){{var ws=new WebSocket('ws://'+location.hostname+':{reload_port}');\
ws.onmessage=function(e){{if(e.data==='reload')location.reload();}};}})();</script>"
    )
}

/// Insert the reload client right before the last `</body>`, or at the end
/// when the page has none.
pub fn inject_reload_script(body: Vec<u8>, reload_port: u16) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let script = reload_script(reload_port);
    let pos = body
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(body.len());

    let mut out = Vec::with_capacity(body.len() + script.len());
    out.extend_from_slice(&body[..pos]);
    out.extend_from_slice(script.as_bytes());
    out.extend_from_slice(&body[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn script_goes_before_closing_body() {
        let out = inject_reload_script(b"<html><body><p>hi</p></BODY></html>".to_vec(), 4000);
        let out = String::from_utf8(out).unwrap();
        let script = out.find("<script>").unwrap();
        assert!(script < out.find("</BODY>").unwrap());
        assert!(out.contains(":4000"));
    }

    #[test]
    fn script_is_appended_without_body_tag() {
        let out = String::from_utf8(inject_reload_script(b"<p>x</p>".to_vec(), 1)).unwrap();
        assert!(out.starts_with("<p>x</p><script>"));
    }

    #[test]
    fn resolves_files_and_directory_indexes() {
        let fs = MockFileSystem::new();
        fs.add_file("build/index.html", "<html></html>");
        fs.add_file("build/css/main.css", "a{}");
        let root = Path::new("build");

        assert_eq!(
            resolve_request_path(root, "/", &fs),
            Some(PathBuf::from("build/index.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/css/main.css?v=2", &fs),
            Some(PathBuf::from("build/css/main.css"))
        );
        assert_eq!(resolve_request_path(root, "/missing.js", &fs), None);
        assert_eq!(resolve_request_path(root, "/../secret", &fs), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for(Path::new("a.min.css.map")), "application/json");
        assert_eq!(content_type_for(Path::new("a.SVG")), "image/svg+xml");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
