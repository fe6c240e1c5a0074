//! Bridge from the status bus to subscribed WebSocket connections.
//!
//! [`StatusBridge`] drains the bus and, for each event, resolves the
//! task's subscriber set and pushes the serialized payload to every
//! connection still open. Delivery is strictly best-effort: a failed or
//! slow send never reaches back into task processing, and a dead
//! connection is pruned from the registry on the spot.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;

use geosense_core::status::TaskStatus;
use geosense_core::task_events::{MSG_TYPE_TASK_PROGRESS, MSG_TYPE_TASK_STATUS};
use geosense_events::{SubscriptionRegistry, TaskStatusEvent};

use crate::ws::WsManager;

/// Routes task status events to the connections subscribed to each task.
pub struct StatusBridge {
    ws_manager: Arc<WsManager>,
    subscriptions: Arc<SubscriptionRegistry>,
}

impl StatusBridge {
    /// Create a bridge over the given connection manager and registry.
    pub fn new(ws_manager: Arc<WsManager>, subscriptions: Arc<SubscriptionRegistry>) -> Self {
        Self {
            ws_manager,
            subscriptions,
        }
    }

    /// Run the delivery loop.
    ///
    /// Consumes events from the bus via `receiver` until the channel is
    /// closed (i.e. the [`StatusBus`](geosense_events::StatusBus) is
    /// dropped during shutdown).
    pub async fn run(self, mut receiver: broadcast::Receiver<TaskStatusEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.deliver(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Status bridge lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Status bus closed, bridge shutting down");
                    break;
                }
            }
        }
    }

    /// Fan one event out to the task's current subscriber set.
    async fn deliver(&self, event: &TaskStatusEvent) {
        let subscribers = self.subscriptions.subscribers(event.task_id).await;
        if subscribers.is_empty() {
            return;
        }

        let payload = serialize_event(event);
        let message = Message::Text(payload.to_string().into());

        for conn_id in subscribers {
            if !self
                .ws_manager
                .send_to_conn(&conn_id, message.clone())
                .await
            {
                // Stale handle: the socket is gone but the close-time
                // cleanup has not run (or lost a race with this publish).
                // Prune it so later events skip the dead connection.
                tracing::debug!(
                    conn_id = %conn_id,
                    task_id = event.task_id,
                    "Pruning stale subscriber",
                );
                self.subscriptions.unsubscribe_all(&conn_id).await;
            }
        }
    }
}

/// Build the wire payload for one event.
fn serialize_event(event: &TaskStatusEvent) -> serde_json::Value {
    let msg_type = if event.status == TaskStatus::Running && event.progress.is_some() {
        MSG_TYPE_TASK_PROGRESS
    } else {
        MSG_TYPE_TASK_STATUS
    };

    let mut payload = serde_json::to_value(event).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("type".into(), serde_json::json!(msg_type));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_events_carry_the_status_type() {
        let payload = serialize_event(&TaskStatusEvent::new(1, TaskStatus::Completed));
        assert_eq!(payload["type"], MSG_TYPE_TASK_STATUS);
        assert_eq!(payload["taskId"], 1);
        assert_eq!(payload["status"], "COMPLETED");
    }

    #[test]
    fn progress_events_carry_the_progress_type() {
        let payload =
            serialize_event(&TaskStatusEvent::new(2, TaskStatus::Running).with_progress(40));
        assert_eq!(payload["type"], MSG_TYPE_TASK_PROGRESS);
        assert_eq!(payload["progress"], 40);
    }
}
