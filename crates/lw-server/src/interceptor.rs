//! Response interception.
//!
//! Rewrites selected responses after the static handler has produced
//! them: missing documents become the entry document when single-page
//! application routing is on, and served entry documents get the reload
//! bootstrap snippet injected when live reload is on.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;
use crate::static_files::ServedFile;

/// Document served for the root of the site and for rewritten routes.
pub(crate) const ENTRY_DOCUMENT: &str = "index.html";

/// Middleware applying the rewrite rules to every response.
pub(crate) async fn intercept(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    apply(&state, response).await
}

/// Apply the rewrite rules to one response.
///
/// Rules, in order:
/// 1. 404 with single-page application routing on: serve the entry
///    document instead (with the snippet when live reload is also on).
/// 2. Successful response that served a file named `index.html`, live
///    reload on: re-serve it with the snippet injected.
/// 3. Anything else passes through untouched.
async fn apply(state: &AppState, response: Response) -> Response {
    if state.config.spa && response.status() == StatusCode::NOT_FOUND {
        return entry_document_response(state).await;
    }

    if state.config.livereload
        && response.status().is_success()
        && served_entry_document(&response)
    {
        return entry_document_response(state).await;
    }

    response
}

/// Whether a response served a file whose basename is the entry document.
fn served_entry_document(response: &Response) -> bool {
    response
        .extensions()
        .get::<ServedFile>()
        .and_then(|served| served.0.file_name())
        .is_some_and(|name| name == ENTRY_DOCUMENT)
}

/// Serve the entry document, injecting the reload snippet when live
/// reload is enabled.
async fn entry_document_response(state: &AppState) -> Response {
    let bytes = match state.loader.read(Path::new(ENTRY_DOCUMENT)).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "Failed to read entry document");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = if state.config.livereload {
        let html = String::from_utf8_lossy(&bytes);
        match inject_snippet(&html, state.config.lr_port) {
            Some(injected) => Body::from(injected),
            None => {
                tracing::warn!("Entry document has no </body> tag, serving unmodified");
                Body::from(bytes)
            }
        }
    } else {
        Body::from(bytes)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(body)
        .unwrap()
}

/// Insert the reload bootstrap snippet before the closing body tag.
///
/// Returns `None` when the document has no `</body>`.
fn inject_snippet(html: &str, lr_port: u16) -> Option<String> {
    let pos = html.rfind("</body>")?;

    let mut injected = String::with_capacity(html.len() + 256);
    injected.push_str(&html[..pos]);
    injected.push_str(&bootstrap_snippet(lr_port));
    injected.push_str(&html[pos..]);
    Some(injected)
}

/// Bootstrap snippet loading the reload client from the reload listener.
///
/// Resolves the host at load time from `location.host` so the page works
/// whether it was opened via localhost or a LAN address.
fn bootstrap_snippet(lr_port: u16) -> String {
    format!(
        "<script>document.write('<script src=\"http://' + \
         (location.host || 'localhost').split(':')[0] + \
         ':{lr_port}/livereload.js?snipver=1\"></' + 'script>')</script>"
    )
}
