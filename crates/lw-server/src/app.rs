//! Router assembly.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{interceptor, static_files};

/// Create the main application router.
///
/// Every request falls through to the static handler; the interception
/// layer then rewrites the response when single-page application routing
/// or live reload call for it.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(static_files::serve_path)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            interceptor::intercept,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsLoader;
    use crate::{ServerConfig, state::AppState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<html><body>app</body></html>",
        )
        .unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/style.css"), "body {}").unwrap();
        dir
    }

    fn router_for(dir: &tempfile::TempDir, spa: bool, livereload: bool) -> Router {
        let config = ServerConfig {
            dir: dir.path().to_path_buf(),
            spa,
            livereload,
            ..ServerConfig::default()
        };
        let loader = Arc::new(FsLoader::new(config.dir.clone()));
        create_router(Arc::new(AppState { config, loader }))
    }

    async fn get(router: Router, path: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_serves_entry_document_at_root() {
        let dir = site();
        let (status, body) = get(router_for(&dir, false, false), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html><body>app</body></html>");
    }

    #[tokio::test]
    async fn test_serves_asset_with_content_type() {
        let dir = site();
        let router = router_for(&dir, false, false);

        let response = router
            .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );
    }

    #[tokio::test]
    async fn test_missing_path_is_not_found() {
        let dir = site();
        let (status, _) = get(router_for(&dir, false, false), "/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_spa_serves_entry_document_for_missing_path() {
        let dir = site();
        let (status, body) = get(router_for(&dir, true, false), "/missing/route").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html><body>app</body></html>");
    }

    #[tokio::test]
    async fn test_livereload_injects_snippet_into_entry_document() {
        let dir = site();
        let (status, body) = get(router_for(&dir, false, true), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("livereload.js?snipver=1"));
        assert_eq!(body.matches("</body>").count(), 1);
    }

    #[tokio::test]
    async fn test_livereload_leaves_assets_untouched() {
        let dir = site();
        let (status, body) = get(router_for(&dir, false, true), "/app.js").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log('hi');");
    }

    #[tokio::test]
    async fn test_directory_without_entry_document_lists_contents() {
        let dir = site();
        let (status, body) = get(router_for(&dir, false, false), "/assets").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("style.css"));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = site();
        let (status, _) = get(router_for(&dir, false, false), "/..%2f..%2fetc/passwd").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
