//! Filesystem watching for live reload.
//!
//! Observes one or more watch roots and forwards create/modify/remove
//! events into a channel. The served-directory root excludes dependency
//! directories by default; user-specified extra roots apply no default
//! exclusions so a path a user explicitly asked to watch is never
//! filtered out.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::ServerError;

/// Exclusions applied to the served-directory watch root.
const DEFAULT_EXCLUSIONS: &[&str] = &["node_modules", "bower_components", ".git"];

/// Kind of observed filesystem mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// One observed filesystem mutation.
#[derive(Clone, Debug)]
pub(crate) struct ChangeEvent {
    /// Affected path.
    pub(crate) path: PathBuf,
    /// Mutation kind.
    pub(crate) kind: ChangeKind,
    /// When the event was observed.
    #[allow(dead_code)]
    pub(crate) timestamp: SystemTime,
}

/// A filesystem root registered for observation.
#[derive(Clone, Debug)]
pub(crate) struct WatchRoot {
    /// Root path to observe.
    pub(crate) path: PathBuf,
    /// Glob patterns and directory names excluded from observation.
    pub(crate) exclusions: Vec<String>,
    /// Whether to observe subdirectories.
    pub(crate) recursive: bool,
}

impl WatchRoot {
    /// Root for the served directory, with default dependency-directory
    /// exclusions plus any configured extras.
    pub(crate) fn served_dir(path: PathBuf, extra_exclusions: &[String]) -> Self {
        let mut exclusions: Vec<String> =
            DEFAULT_EXCLUSIONS.iter().map(|&s| s.to_owned()).collect();
        exclusions.extend(extra_exclusions.iter().cloned());
        Self {
            path,
            exclusions,
            recursive: true,
        }
    }

    /// Root for a user-specified extra watch path. No default exclusions.
    pub(crate) fn extra(path: PathBuf) -> Self {
        Self {
            path,
            exclusions: Vec::new(),
            recursive: true,
        }
    }

    /// Check whether `path` is excluded from this root.
    ///
    /// A pattern excludes a path when it matches the path relative to the
    /// root as a glob, or when it equals any path component (so
    /// `node_modules` excludes nested dependency trees).
    fn excludes(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.path) else {
            return false;
        };
        let relative_str = relative.to_string_lossy();

        self.exclusions.iter().any(|pattern| {
            if glob::Pattern::new(pattern).is_ok_and(|g| g.matches(&relative_str)) {
                return true;
            }
            relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy() == pattern.as_str())
        })
    }
}

/// Map a notify event kind to a [`ChangeKind`].
fn map_kind(kind: EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Modify(_) => Some(ChangeKind::Changed),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Watches a set of [`WatchRoot`]s and emits [`ChangeEvent`]s.
///
/// Each root gets its own underlying notify watcher so a root that cannot
/// be observed does not affect the others.
pub(crate) struct FileWatcher {
    watchers: Vec<RecommendedWatcher>,
}

impl FileWatcher {
    /// Start observing `roots`.
    ///
    /// Roots that cannot be watched (missing, not permitted) are logged
    /// and skipped; the remaining roots stay active.
    pub(crate) fn watch(roots: &[WatchRoot]) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel::<ChangeEvent>(100);

        let mut watchers = Vec::with_capacity(roots.len());
        for root in roots {
            match Self::watch_root(root, tx.clone()) {
                Ok(watcher) => watchers.push(watcher),
                Err(source) => {
                    let err = ServerError::WatchRootUnavailable {
                        path: root.path.clone(),
                        source,
                    };
                    tracing::warn!(error = %err, "Skipping unavailable watch root");
                }
            }
        }

        (Self { watchers }, rx)
    }

    /// Start one notify watcher for a single root.
    fn watch_root(
        root: &WatchRoot,
        tx: mpsc::Sender<ChangeEvent>,
    ) -> Result<RecommendedWatcher, notify::Error> {
        let filter = root.clone();

        // Callback is sync, so bridge into the async channel with blocking_send
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let Ok(event) = res else { return };
            let Some(kind) = map_kind(event.kind) else {
                return;
            };

            for path in &event.paths {
                if filter.excludes(path) {
                    continue;
                }
                let _ = tx.blocking_send(ChangeEvent {
                    path: path.clone(),
                    kind,
                    timestamp: SystemTime::now(),
                });
            }
        })?;

        let mode = if root.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&root.path, mode)?;

        Ok(watcher)
    }

    /// Stop all observation and release OS watch resources. Idempotent.
    pub(crate) fn close(&mut self) {
        if !self.watchers.is_empty() {
            tracing::debug!(roots = self.watchers.len(), "Closing file watcher");
        }
        self.watchers.clear();
    }
}
