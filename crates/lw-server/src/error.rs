//! Server error types.

use std::path::PathBuf;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind a listener socket. Fatal at startup.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A watch root could not be observed.
    #[error("Cannot watch {}: {source}", .path.display())]
    WatchRootUnavailable {
        /// Root path that could not be watched.
        path: PathBuf,
        /// Underlying notify error.
        source: notify::Error,
    },

    /// I/O error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
