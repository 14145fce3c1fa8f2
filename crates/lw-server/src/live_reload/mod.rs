//! Live reload subsystem.
//!
//! Watches filesystem roots, coalesces change bursts, and pushes reload
//! notifications to connected browsers over a dedicated WebSocket
//! listener:
//!
//! ```text
//! filesystem event ─► FileWatcher ─► Debouncer (per-path window)
//!                                        │
//!                                        ▼
//!                      browsers ◄── ChangeNotifier.broadcast(path)
//! ```

mod debouncer;
mod manager;
mod notifier;
mod protocol;
mod watcher;

pub(crate) use manager::LiveReloadManager;
pub(crate) use notifier::ChangeNotifier;
pub(crate) use protocol::reload_router;
pub(crate) use watcher::WatchRoot;
