//! Integration tests for the status bridge: bus-to-WebSocket fan-out,
//! subscription scoping, and disconnect cleanup.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc::UnboundedReceiver;

use geosense_api::notifications::StatusBridge;
use geosense_api::ws::WsManager;
use geosense_core::status::TaskStatus;
use geosense_events::{StatusBus, SubscriptionRegistry, TaskStatusEvent};

/// Generous upper bound for waiting on a delivery.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Time to let the bridge drain when asserting that nothing arrives.
const QUIET_PERIOD: Duration = Duration::from_millis(200);

struct Fixture {
    manager: Arc<WsManager>,
    registry: Arc<SubscriptionRegistry>,
    bus: Arc<StatusBus>,
}

impl Fixture {
    /// Start a bridge wired to a fresh manager, registry, and bus.
    async fn start() -> Self {
        let manager = Arc::new(WsManager::new());
        let registry = Arc::new(SubscriptionRegistry::new());
        let bus = Arc::new(StatusBus::default());

        let bridge = StatusBridge::new(Arc::clone(&manager), Arc::clone(&registry));
        tokio::spawn(bridge.run(bus.subscribe()));

        Self {
            manager,
            registry,
            bus,
        }
    }

    /// Register a connection and subscribe it to the given tasks.
    async fn connect(&self, conn_id: &str, tasks: &[i64]) -> UnboundedReceiver<Message> {
        let rx = self.manager.add(conn_id.to_string(), None).await;
        for &task_id in tasks {
            self.registry.subscribe(task_id, conn_id).await;
        }
        rx
    }
}

/// Receive one text payload, parsed as JSON.
async fn recv_json(rx: &mut UnboundedReceiver<Message>) -> serde_json::Value {
    let msg = tokio::time::timeout(DELIVERY_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("channel closed unexpectedly");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("valid JSON payload"),
        other => panic!("expected a Text frame, got: {other:?}"),
    }
}

/// Assert no message arrives within the quiet period.
async fn assert_silent(rx: &mut UnboundedReceiver<Message>) {
    tokio::time::sleep(QUIET_PERIOD).await;
    assert!(
        rx.try_recv().is_err(),
        "expected no delivery on this connection"
    );
}

// ---------------------------------------------------------------------------
// Test: one event reaches each subscriber exactly once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fan_out_delivers_once_per_subscriber() {
    let fx = Fixture::start().await;

    let mut rx_a = fx.connect("conn-a", &[1]).await;
    let mut rx_b = fx.connect("conn-b", &[1]).await;
    let mut rx_c = fx.connect("conn-c", &[]).await;

    fx.bus
        .publish(TaskStatusEvent::new(1, TaskStatus::Running).with_progress(10));

    let payload_a = recv_json(&mut rx_a).await;
    let payload_b = recv_json(&mut rx_b).await;
    assert_eq!(payload_a["taskId"], 1);
    assert_eq!(payload_a["status"], "RUNNING");
    assert_eq!(payload_b["taskId"], 1);

    // Exactly once each; the unsubscribed connection stays silent.
    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_err());
    assert_silent(&mut rx_c).await;
}

// ---------------------------------------------------------------------------
// Test: events are scoped to the subscribed task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_only_reach_that_tasks_subscribers() {
    let fx = Fixture::start().await;

    let mut rx_a = fx.connect("conn-a", &[1]).await;
    let mut rx_b = fx.connect("conn-b", &[2]).await;

    fx.bus.publish(TaskStatusEvent::new(2, TaskStatus::Completed));

    let payload_b = recv_json(&mut rx_b).await;
    assert_eq!(payload_b["taskId"], 2);
    assert_eq!(payload_b["status"], "COMPLETED");

    assert_silent(&mut rx_a).await;
}

// ---------------------------------------------------------------------------
// Test: subscribing after the event does not replay it
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_subscriber_sees_no_replay() {
    let fx = Fixture::start().await;

    // Terminal event published with nobody watching.
    fx.bus.publish(TaskStatusEvent::new(5, TaskStatus::Failed));
    tokio::time::sleep(QUIET_PERIOD).await;

    let mut rx_late = fx.connect("conn-late", &[5]).await;
    assert_silent(&mut rx_late).await;

    // The subscription itself is live for future events.
    fx.bus.publish(TaskStatusEvent::new(5, TaskStatus::Failed));
    let payload = recv_json(&mut rx_late).await;
    assert_eq!(payload["taskId"], 5);
}

// ---------------------------------------------------------------------------
// Test: disconnect cleanup removes every membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_cleanup_stops_deliveries() {
    let fx = Fixture::start().await;

    let rx_a = fx.connect("conn-a", &[1, 2]).await;
    let mut rx_b = fx.connect("conn-b", &[1]).await;

    // Close A the way the WebSocket handler does on disconnect.
    drop(rx_a);
    fx.registry.unsubscribe_all("conn-a").await;
    fx.manager.remove("conn-a").await;

    fx.bus.publish(TaskStatusEvent::new(1, TaskStatus::Completed));
    fx.bus.publish(TaskStatusEvent::new(2, TaskStatus::Completed));

    // B still receives task 1; nothing errors for the gone connection.
    let payload = recv_json(&mut rx_b).await;
    assert_eq!(payload["taskId"], 1);

    assert!(fx.registry.subscribers(1).await == vec!["conn-b".to_string()]);
    assert!(fx.registry.subscribers(2).await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: a stale handle is pruned on delivery failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_handle_is_pruned_on_delivery() {
    let fx = Fixture::start().await;

    // The receiver is dropped but the close-time cleanup never ran, so
    // the registry still holds the membership.
    let rx_stale = fx.connect("conn-stale", &[3]).await;
    drop(rx_stale);

    fx.bus.publish(TaskStatusEvent::new(3, TaskStatus::Running));

    // Delivery fails, and the bridge prunes the membership.
    tokio::time::sleep(QUIET_PERIOD).await;
    assert!(fx.registry.subscribers(3).await.is_empty());
}
