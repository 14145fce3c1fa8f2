//! Live reload manager.
//!
//! Wires the file watcher, the debouncer, and the change notifier
//! together and owns their lifecycles.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::debouncer::{DEFAULT_DEBOUNCE_MS, Debouncer};
use super::notifier::ChangeNotifier;
use super::watcher::{ChangeEvent, ChangeKind, FileWatcher, WatchRoot};

/// Poll interval for the debounce drain loop.
const DRAIN_POLL_MS: u64 = 50;

/// Coordinates file watching, debouncing, and reload broadcasting.
///
/// Data flow: watcher events are logged and modify events are submitted
/// to the debouncer; a drain task polls the debouncer and broadcasts each
/// coalesced path through the notifier.
pub(crate) struct LiveReloadManager {
    notifier: Arc<ChangeNotifier>,
    debouncer: Arc<Debouncer>,
    roots: Vec<PathBuf>,
    watcher: Option<FileWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveReloadManager {
    /// Create a manager with the default debounce window.
    pub(crate) fn new(notifier: Arc<ChangeNotifier>) -> Self {
        Self::with_debounce(notifier, Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    /// Create a manager with an explicit debounce window.
    pub(crate) fn with_debounce(notifier: Arc<ChangeNotifier>, window: Duration) -> Self {
        Self {
            notifier,
            debouncer: Arc::new(Debouncer::new(window)),
            roots: Vec::new(),
            watcher: None,
            tasks: Vec::new(),
        }
    }

    /// Start watching `roots` and broadcasting debounced changes.
    ///
    /// Unavailable roots are logged and skipped by the watcher; the
    /// remaining roots stay active.
    pub(crate) fn start(&mut self, roots: Vec<WatchRoot>) {
        let (watcher, mut rx) = FileWatcher::watch(&roots);
        self.roots = roots.into_iter().map(|r| r.path).collect();
        self.watcher = Some(watcher);

        // Record task: log every event, debounce the modify events
        let debouncer = Arc::clone(&self.debouncer);
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                record_event(event, &debouncer);
            }
        }));

        // Drain task: broadcast each coalesced path once its window expires
        let debouncer = Arc::clone(&self.debouncer);
        let notifier = Arc::clone(&self.notifier);
        let roots = self.roots.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(DRAIN_POLL_MS));
            loop {
                interval.tick().await;
                for path in debouncer.drain_ready() {
                    let changed = relativize(&path, &roots);
                    let delivered = notifier.broadcast(&changed);
                    tracing::debug!(path = %changed, delivered, "Broadcast reload");
                }
            }
        }));
    }

    /// Stop watching, cancel pending debounce entries without firing
    /// them, and close all reload connections.
    pub(crate) fn shutdown(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.close();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let cancelled = self.debouncer.cancel_all();
        if cancelled > 0 {
            tracing::debug!(cancelled, "Dropped pending debounce entries");
        }
        self.notifier.close_all();
    }
}

impl Drop for LiveReloadManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Log a watcher event and submit modify events to the debouncer.
fn record_event(event: ChangeEvent, debouncer: &Debouncer) {
    match event.kind {
        ChangeKind::Added => {
            tracing::info!(path = %event.path.display(), "File has been added");
        }
        ChangeKind::Changed => {
            tracing::info!(path = %event.path.display(), "File has been changed");
            debouncer.submit(event.path);
        }
        ChangeKind::Removed => {
            tracing::info!(path = %event.path.display(), "File has been removed");
        }
    }
}

/// Express a changed path relative to its watch root.
///
/// Falls back to the full path when the event came from outside every
/// registered root (should not happen in practice).
fn relativize(path: &Path, roots: &[PathBuf]) -> String {
    roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn test_relativize_strips_matching_root() {
        let roots = vec![PathBuf::from("/site"), PathBuf::from("/lib")];

        assert_eq!(relativize(Path::new("/site/app.js"), &roots), "app.js");
        assert_eq!(
            relativize(Path::new("/lib/sub/util.js"), &roots),
            "sub/util.js"
        );
        assert_eq!(
            relativize(Path::new("/other/f.js"), &roots),
            "/other/f.js"
        );
    }

    #[test]
    fn test_record_event_only_debounces_changes() {
        let debouncer = Debouncer::new(Duration::from_millis(0));

        let event = |kind| ChangeEvent {
            path: PathBuf::from("/site/f.js"),
            kind,
            timestamp: SystemTime::now(),
        };

        record_event(event(ChangeKind::Added), &debouncer);
        record_event(event(ChangeKind::Removed), &debouncer);
        assert!(debouncer.drain_ready().is_empty());

        record_event(event(ChangeKind::Changed), &debouncer);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(debouncer.drain_ready().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rapid_writes_produce_single_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.js");
        std::fs::write(&file, "initial").unwrap();

        let notifier = Arc::new(ChangeNotifier::new());
        let (_id, mut rx) = notifier.register();

        let mut manager = LiveReloadManager::with_debounce(
            Arc::clone(&notifier),
            Duration::from_millis(100),
        );
        manager.start(vec![WatchRoot::served_dir(dir.path().to_path_buf(), &[])]);

        // Let the watcher settle before writing
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Three writes within 50ms of each other
        for i in 0..3 {
            std::fs::write(&file, format!("content {i}")).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let first = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("expected a reload broadcast")
            .expect("notifier closed unexpectedly");
        assert_eq!(first, "f.js");

        // No second broadcast for the same burst
        let second = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await;
        assert!(second.is_err(), "burst produced more than one broadcast");

        manager.shutdown();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_cancels_pending_without_firing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.js");
        std::fs::write(&file, "initial").unwrap();

        let notifier = Arc::new(ChangeNotifier::new());
        let (_id, mut rx) = notifier.register();

        let mut manager = LiveReloadManager::with_debounce(
            Arc::clone(&notifier),
            Duration::from_millis(500),
        );
        manager.start(vec![WatchRoot::served_dir(dir.path().to_path_buf(), &[])]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&file, "changed").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Shut down while the debounce window is still open
        manager.shutdown();

        // The pending entry must not fire; the stream just ends
        let outcome = tokio::time::timeout(Duration::from_millis(800), rx.recv()).await;
        assert!(matches!(outcome, Ok(None)));
    }

    #[tokio::test]
    async fn test_missing_root_does_not_prevent_start() {
        let notifier = Arc::new(ChangeNotifier::new());
        let mut manager = LiveReloadManager::new(Arc::clone(&notifier));

        manager.start(vec![WatchRoot::extra(PathBuf::from(
            "/nonexistent/watch/root",
        ))]);

        manager.shutdown();
    }
}
