use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use geosense_core::types::DbId;
use geosense_events::SubscriptionRegistry;

use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Inbound control frame: a client declaring (or revoking) interest in a
/// task's status events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeFrame {
    task_id: DbId,
    /// `"subscribe"` (default) or `"unsubscribe"`.
    action: Option<String>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, state.subscriptions))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound subscribe/unsubscribe frames on the current task.
///   4. Cleans up the connection and all of its subscriptions on disconnect.
async fn handle_socket(
    socket: WebSocket,
    ws_manager: Arc<WsManager>,
    subscriptions: Arc<SubscriptionRegistry>,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = ws_manager.add(conn_id.clone(), None).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound messages.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_text_frame(&conn_id, text.as_str(), &subscriptions).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: drop all subscriptions, remove the connection, stop the
    // sender. Later publishes for previously watched tasks will no longer
    // attempt delivery here.
    subscriptions.unsubscribe_all(&conn_id).await;
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Parse and apply one inbound text frame. Malformed frames are logged and
/// ignored -- a bad subscriber must not tear down the connection.
async fn handle_text_frame(conn_id: &str, text: &str, subscriptions: &SubscriptionRegistry) {
    let frame: SubscribeFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed frame");
            return;
        }
    };

    match frame.action.as_deref() {
        Some("unsubscribe") => {
            subscriptions.unsubscribe(frame.task_id, conn_id).await;
            tracing::debug!(conn_id = %conn_id, task_id = frame.task_id, "Unsubscribed");
        }
        _ => {
            subscriptions.subscribe(frame.task_id, conn_id).await;
            tracing::debug!(conn_id = %conn_id, task_id = frame.task_id, "Subscribed");
        }
    }
}
