//! Static file serving.
//!
//! Serves `GET /{any-path}` from the configured directory, with
//! `index.html` resolution and an HTML directory listing for directories
//! without one. Successful file responses are tagged with the served path
//! so the response interceptor can see which file went out.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::loader::LoadError;
use crate::state::AppState;

/// Characters that would break an href if left raw in a path segment.
const HREF_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Response extension recording which file a response served.
#[derive(Clone, Debug)]
pub(crate) struct ServedFile(pub(crate) PathBuf);

/// Serve a request path from the configured directory.
pub(crate) async fn serve_path(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response {
    let url_path = req.uri().path();

    let Some(rel) = sanitize_path(url_path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let full = state.config.dir.join(&rel);
    match tokio::fs::metadata(&full).await {
        Ok(meta) if meta.is_dir() => {
            let index = rel.join("index.html");
            if tokio::fs::try_exists(state.config.dir.join(&index))
                .await
                .unwrap_or(false)
            {
                serve_file(&state, &index).await
            } else {
                serve_listing(&full, url_path).await
            }
        }
        Ok(_) => serve_file(&state, &rel).await,
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve one file through the document loader.
async fn serve_file(state: &AppState, rel: &Path) -> Response {
    match state.loader.read(rel).await {
        Ok(bytes) => {
            let mut response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime_for(rel))
                .body(Body::from(bytes))
                .unwrap();
            response
                .extensions_mut()
                .insert(ServedFile(rel.to_path_buf()));
            response
        }
        Err(LoadError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::warn!(path = %rel.display(), error = %err, "Failed to read file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Render an HTML listing for a directory without an entry document.
async fn serve_listing(dir: &Path, url_path: &str) -> Response {
    let mut entries = Vec::new();
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(err) => {
            tracing::warn!(path = %dir.display(), error = %err, "Failed to list directory");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();

    let base = if url_path.ends_with('/') {
        url_path.to_owned()
    } else {
        format!("{url_path}/")
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>Index of {}</title></head>\n", escape(url_path)));
    html.push_str(&format!("<body><h1>Index of {}</h1>\n<ul>\n", escape(url_path)));
    if url_path != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for name in &entries {
        html.push_str(&format!(
            "<li><a href=\"{base}{href}\">{text}</a></li>\n",
            href = utf8_percent_encode(name, HREF_ENCODE),
            text = escape(name)
        ));
    }
    html.push_str("</ul></body></html>\n");

    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

/// Decode and normalize a URL path into a relative filesystem path.
///
/// Returns `None` for paths that escape the served directory.
fn sanitize_path(url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path).decode_utf8().ok()?;
    let trimmed = decoded.trim_start_matches('/');

    let mut rel = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(rel)
}

/// Minimal HTML escaping for listing entries.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Content type from file extension.
fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}
