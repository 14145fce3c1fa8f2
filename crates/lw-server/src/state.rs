//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use crate::ServerConfig;
use crate::loader::DocumentLoader;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Immutable configuration snapshot.
    pub(crate) config: ServerConfig,
    /// Loader for reading served documents.
    pub(crate) loader: Arc<dyn DocumentLoader>,
}
