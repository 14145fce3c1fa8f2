//! Document loading abstraction.
//!
//! Provides the [`DocumentLoader`] trait for reading served documents from
//! the underlying storage. This keeps filesystem access out of the response
//! interception logic and enables unit testing with an in-memory backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Document read error.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Document does not exist.
    #[error("Document not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error while reading.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Reads document bytes for serving.
///
/// Paths are relative to the served directory.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Read the full contents of a document.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, LoadError>;
}

/// Filesystem-backed document loader rooted at the served directory.
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    /// Create a loader rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl DocumentLoader for FsLoader {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, LoadError> {
        let full = self.root.join(path);
        tokio::fs::read(&full).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(full)
            } else {
                LoadError::Io { path: full, source }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;

    use super::{DocumentLoader, LoadError, Path, PathBuf, async_trait};

    /// In-memory loader for tests.
    #[derive(Default)]
    pub(crate) struct MemoryLoader {
        files: HashMap<PathBuf, Vec<u8>>,
    }

    impl MemoryLoader {
        pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
            self.files
                .insert(PathBuf::from(path), content.as_bytes().to_vec());
            self
        }
    }

    #[async_trait]
    impl DocumentLoader for MemoryLoader {
        async fn read(&self, path: &Path) -> Result<Vec<u8>, LoadError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| LoadError::NotFound(path.to_path_buf()))
        }
    }
}
