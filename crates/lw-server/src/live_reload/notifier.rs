//! Reload notification fan-out.
//!
//! Owns the set of connected reload clients and broadcasts changed paths
//! to all of them. The registry is the only state touched from multiple
//! concurrent contexts (connection acceptance vs. debounce-triggered
//! broadcasts), so it lives behind a mutex.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

/// Broadcasts changed paths to registered reload clients.
///
/// Connections are held as unbounded senders; a send failure means the
/// client side is gone, and the entry is pruned without affecting the
/// remaining clients.
pub(crate) struct ChangeNotifier {
    clients: Mutex<HashMap<usize, mpsc::UnboundedSender<String>>>,
    next_id: AtomicUsize,
}

impl ChangeNotifier {
    /// Create an empty notifier.
    pub(crate) fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Register a new client connection.
    ///
    /// Returns the client id and the receiver for changed-path pushes.
    pub(crate) fn register(&self) -> (usize, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.lock().unwrap().insert(id, tx);
        (id, rx)
    }

    /// Remove a client connection.
    pub(crate) fn unregister(&self, id: usize) {
        self.clients.lock().unwrap().remove(&id);
    }

    /// Broadcast a changed path to every registered client.
    ///
    /// Failed sends are isolated: the broken connection is removed from
    /// the registry and delivery continues to the others. Returns the
    /// number of clients reached.
    pub(crate) fn broadcast(&self, path: &str) -> usize {
        let mut clients = self.clients.lock().unwrap();

        let dead: Vec<usize> = clients
            .iter()
            .filter(|(_, tx)| tx.send(path.to_owned()).is_err())
            .map(|(id, _)| *id)
            .collect();

        for id in &dead {
            clients.remove(id);
            tracing::debug!(id, "Dropped broken reload connection");
        }

        clients.len()
    }

    /// Number of currently registered clients.
    pub(crate) fn client_count(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    /// Close every registered connection.
    ///
    /// Dropping the senders ends each client's push stream.
    pub(crate) fn close_all(&self) {
        self.clients.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_all_clients() {
        let notifier = ChangeNotifier::new();
        let (_id1, mut rx1) = notifier.register();
        let (_id2, mut rx2) = notifier.register();

        let delivered = notifier.broadcast("app.js");

        assert_eq!(delivered, 2);
        assert_eq!(rx1.recv().await.as_deref(), Some("app.js"));
        assert_eq!(rx2.recv().await.as_deref(), Some("app.js"));
    }

    #[tokio::test]
    async fn test_broken_connection_is_isolated() {
        let notifier = ChangeNotifier::new();
        let (_id1, rx1) = notifier.register();
        let (_id2, mut rx2) = notifier.register();

        // Simulate a disconnected browser
        drop(rx1);

        let delivered = notifier.broadcast("app.js");

        assert_eq!(delivered, 1);
        assert_eq!(notifier.client_count(), 1);
        assert_eq!(rx2.recv().await.as_deref(), Some("app.js"));
    }

    #[test]
    fn test_broadcast_with_no_clients() {
        let notifier = ChangeNotifier::new();
        assert_eq!(notifier.broadcast("app.js"), 0);
    }

    #[tokio::test]
    async fn test_unregister_removes_client() {
        let notifier = ChangeNotifier::new();
        let (id, _rx) = notifier.register();

        notifier.unregister(id);

        assert_eq!(notifier.client_count(), 0);
    }

    #[tokio::test]
    async fn test_close_all_ends_client_streams() {
        let notifier = ChangeNotifier::new();
        let (_id, mut rx) = notifier.register();

        notifier.close_all();

        assert_eq!(rx.recv().await, None);
        assert_eq!(notifier.client_count(), 0);
    }
}
