//! Browser-facing reload wire protocol.
//!
//! Serves the reload client script and a WebSocket push channel on a
//! dedicated listener (default port 35729). The protocol is LiveReload-
//! style JSON: the client opens the socket and sends a hello, the server
//! replies with its own hello, then pushes a reload command for every
//! broadcast changed path until either side disconnects.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::{Deserialize, Serialize};

use super::notifier::ChangeNotifier;

/// Reload client script injected pages load from this listener.
const RELOAD_CLIENT_JS: &str = include_str!("../../assets/livereload.js");

/// Protocol identifier sent in hello messages.
const PROTOCOL_V7: &str = "http://livereload.com/protocols/official-7";

/// Messages exchanged on the reload channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "lowercase")]
pub(crate) enum ReloadMessage {
    /// Handshake, sent by both sides.
    Hello {
        /// Supported protocol identifiers.
        protocols: Vec<String>,
        /// Server identifier; absent in client hellos.
        #[serde(rename = "serverName", default, skip_serializing_if = "Option::is_none")]
        server_name: Option<String>,
    },
    /// Pushed by the server when a watched path changed.
    Reload {
        /// Changed path, relative to its watch root.
        path: String,
        /// Hint that stylesheets may be applied without a full reload.
        #[serde(rename = "liveCSS")]
        live_css: bool,
    },
}

impl ReloadMessage {
    /// Server-side handshake reply.
    fn server_hello() -> Self {
        Self::Hello {
            protocols: vec![PROTOCOL_V7.to_owned()],
            server_name: Some("lw".to_owned()),
        }
    }

    /// Reload push for a changed path.
    fn reload(path: String) -> Self {
        Self::Reload {
            path,
            live_css: true,
        }
    }
}

/// Create the router for the reload listener.
pub(crate) fn reload_router(notifier: Arc<ChangeNotifier>) -> Router {
    Router::new()
        .route("/livereload.js", get(serve_reload_client))
        .route("/livereload", get(ws_handler))
        .with_state(notifier)
}

/// Serve the reload client script.
async fn serve_reload_client() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_CLIENT_JS,
    )
}

/// Handle WebSocket upgrade for the reload channel.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(notifier): State<Arc<ChangeNotifier>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, notifier))
}

/// Handle an established reload connection.
///
/// Registers the connection with the notifier and forwards pushes until
/// the client disconnects or the notifier shuts down.
async fn handle_socket(mut socket: WebSocket, notifier: Arc<ChangeNotifier>) {
    let (id, mut rx) = notifier.register();
    tracing::debug!(id, "Reload client connected");

    loop {
        tokio::select! {
            // Forward broadcast pushes to the client
            changed = rx.recv() => {
                match changed {
                    Some(path) => {
                        let msg = serde_json::to_string(&ReloadMessage::reload(path)).unwrap();
                        if socket.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    // Notifier closed all connections (shutdown)
                    None => break,
                }
            }
            // Handle handshake and disconnect from the client
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if matches!(
                            serde_json::from_str::<ReloadMessage>(&text),
                            Ok(ReloadMessage::Hello { .. })
                        ) {
                            let hello =
                                serde_json::to_string(&ReloadMessage::server_hello()).unwrap();
                            if socket.send(Message::Text(hello.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    notifier.unregister(id);
    tracing::debug!(id, "Reload client disconnected");
}
