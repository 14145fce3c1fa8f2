//! HTTP server for the lw development file server.
//!
//! This crate provides a native Rust HTTP server using axum, serving:
//! - Static files from a configured directory
//! - Response interception for single-page application fallback and
//!   live reload snippet injection
//! - A dedicated reload listener pushing change notifications to
//!   browsers over WebSocket
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use lw_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "localhost".to_string(),
//!         port: 8080,
//!         dir: PathBuf::from("public"),
//!         spa: true,
//!         livereload: true,
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum server (lw-server)
//!                        │
//!                        ├─► Static handler ──► DocumentLoader (fs)
//!                        │        │
//!                        │        └─► Interceptor (SPA fallback,
//!                        │                         snippet injection)
//!                        │
//!                        └─► Reload listener (port 35729)
//!                                 │
//!                                 └─► notify ─► Debouncer ─► WebSocket
//! ```

mod app;
mod error;
mod interceptor;
mod live_reload;
mod loader;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use state::AppState;

pub use error::ServerError;
pub use loader::{DocumentLoader, FsLoader, LoadError};

use live_reload::{ChangeNotifier, LiveReloadManager, WatchRoot, reload_router};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory to serve.
    pub dir: PathBuf,
    /// Serve the entry document for unknown paths.
    pub spa: bool,
    /// Enable live reload.
    pub livereload: bool,
    /// Port for the reload listener.
    pub lr_port: u16,
    /// Extra directories to watch beyond the served directory.
    pub watch: Vec<PathBuf>,
    /// Extra exclusion patterns for the served-directory watch root.
    pub exclude: Vec<String>,
    /// Enable verbose output.
    pub verbose: bool,
    /// Suppress non-error output.
    pub silent: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8080,
            dir: PathBuf::from("."),
            spa: false,
            livereload: false,
            lr_port: 35729,
            watch: Vec::new(),
            exclude: Vec::new(),
            verbose: false,
            silent: false,
        }
    }
}

impl ServerConfig {
    /// URL the server will be reachable at.
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Run the server until a shutdown signal arrives.
///
/// Binds the main listener and, when live reload is enabled, the reload
/// listener and the file watcher.
///
/// # Errors
///
/// Returns an error if either listener fails to bind or serving fails.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let loader: Arc<dyn DocumentLoader> = Arc::new(FsLoader::new(config.dir.clone()));

    // Live reload: watcher, reload listener, push channel
    let mut live_reload = None;
    if config.livereload {
        let notifier = Arc::new(ChangeNotifier::new());

        let mut manager = LiveReloadManager::new(Arc::clone(&notifier));
        let mut roots = vec![WatchRoot::served_dir(config.dir.clone(), &config.exclude)];
        roots.extend(config.watch.iter().cloned().map(WatchRoot::extra));
        manager.start(roots);

        let lr_addr = bind_addr(&config.host, config.lr_port)?;
        let listener = tokio::net::TcpListener::bind(lr_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: lr_addr.to_string(),
                source,
            })?;
        tracing::info!(port = config.lr_port, "Live reload listening");

        let reload_task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, reload_router(notifier)).await {
                tracing::error!(error = %err, "Reload listener failed");
            }
        });

        live_reload = Some((manager, reload_task));
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        loader,
    });
    let app = app::create_router(state);

    let addr = bind_addr(&config.host, config.port)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    tracing::info!(address = %addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((mut manager, reload_task)) = live_reload {
        manager.shutdown();
        reload_task.abort();
    }

    Ok(())
}

/// Resolve a host/port pair into a socket address.
fn bind_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    // "localhost" is a hostname, not an address; resolve it explicitly
    let host = if host == "localhost" { "127.0.0.1" } else { host };
    SocketAddr::from_str(&format!("{host}:{port}")).map_err(|_| ServerError::Bind {
        addr: format!("{host}:{port}"),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid bind address"),
    })
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from lw config.
#[must_use]
pub fn server_config_from_config(config: &lw_config::Config, verbose: bool, silent: bool) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        dir: config.serve_resolved.dir.clone(),
        spa: config.serve_resolved.spa,
        livereload: config.live_reload_resolved.enabled,
        lr_port: config.live_reload_resolved.port,
        watch: config.live_reload_resolved.watch.clone(),
        exclude: config.live_reload_resolved.exclude.clone(),
        verbose,
        silent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_url() {
        let config = ServerConfig::default();
        assert_eq!(config.server_url(), "http://localhost:8080");

        let config = ServerConfig {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            ..ServerConfig::default()
        };
        assert_eq!(config.server_url(), "http://0.0.0.0:3000");
    }

    #[test]
    fn test_bind_addr_resolves_localhost() {
        let addr = bind_addr("localhost", 8080).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_bind_addr_rejects_garbage() {
        assert!(bind_addr("not a host", 8080).is_err());
    }

    #[test]
    fn test_default_matches_documented_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.spa);
        assert!(!config.livereload);
        assert_eq!(config.lr_port, 35729);
        assert!(config.watch.is_empty());
    }
}
