use crate::http::encode_head;
use futures::prelude::*;
use http::{Method, Request, StatusCode};
use std::io;
use std::path::{Path, PathBuf};

/// Answers a plain HTTP request with a file below `root` and closes the transport.
///
/// Filesystem access runs on the `blocking` thread pool so other connections on the executor
/// keep making progress.
pub async fn serve_file<T: AsyncWrite + Unpin, B>(
    transport: &mut T,
    request: &Request<B>,
    root: &Path,
) -> io::Result<()> {
    let (status, mime, body) = match request.method() {
        &Method::GET | &Method::HEAD => match read_file(root, request.uri().path()).await {
            Some((mime, body)) => (StatusCode::OK, mime, body),
            None => plain(StatusCode::NOT_FOUND),
        },
        _ => plain(StatusCode::METHOD_NOT_ALLOWED),
    };
    log::info!("{} {} {}", request.method(), request.uri(), status.as_u16());
    let mut response = encode_head(
        status,
        &[
            ("Content-Type", mime),
            ("Content-Length", &body.len().to_string()),
            ("Connection", "close"),
        ],
    );
    if request.method() != Method::HEAD {
        response.extend_from_slice(&body);
    }
    transport.write_all(&response).await?;
    transport.close().await
}

/// Resolves `uri_path` below `root` and reads the file with its content type, or `None` if there
/// is no readable file.
pub async fn read_file(root: &Path, uri_path: &str) -> Option<(&'static str, Vec<u8>)> {
    let root = root.to_path_buf();
    let uri_path = uri_path.to_string();
    blocking::unblock(move || {
        let path = resolve(&root, &uri_path)?;
        let body = std::fs::read(&path).ok()?;
        Some((content_type(&path), body))
    })
    .await
}

fn plain(status: StatusCode) -> (StatusCode, &'static str, Vec<u8>) {
    let body = status.canonical_reason().unwrap_or("").as_bytes().to_vec();
    (status, "text/plain; charset=utf-8", body)
}

/// Maps a request path onto `root`. Paths that try to leave `root` yield `None`; directories
/// map to their `index.html`.
pub fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in uri_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains(':') => return None,
            s => path.push(s),
        }
    }
    if path.is_dir() {
        path.push("index.html");
    }
    Some(path)
}

pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
