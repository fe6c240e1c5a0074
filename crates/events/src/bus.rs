//! In-process status bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`StatusBus`] decouples "a task's status changed" from "deliver the
//! change to whoever is watching". It is designed to be shared via
//! `Arc<StatusBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use geosense_core::status::{FailureKind, TaskStatus};
use geosense_core::types::DbId;

// ---------------------------------------------------------------------------
// TaskStatusEvent
// ---------------------------------------------------------------------------

/// One observed status change for one task.
///
/// Ephemeral: events are never persisted and a subscriber that attaches
/// after publication does not see earlier events. Constructed via
/// [`TaskStatusEvent::new`] and enriched with the builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusEvent {
    /// The task whose status changed.
    pub task_id: DbId,

    /// The new canonical status.
    pub status: TaskStatus,

    /// Failure classification, present only when `status` is `FAILED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    /// Progress percentage for a running task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i16>,

    /// Location of the produced result, when the worker reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,

    /// Human-readable error text accompanying a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the change was observed (UTC).
    pub timestamp: DateTime<Utc>,
}

impl TaskStatusEvent {
    /// Create an event carrying only the task id and new status.
    pub fn new(task_id: DbId, status: TaskStatus) -> Self {
        Self {
            task_id,
            status,
            failure: None,
            progress: None,
            result_path: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a failure classification.
    pub fn with_failure(mut self, failure: FailureKind) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Attach a progress percentage.
    pub fn with_progress(mut self, progress: i16) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attach a result location.
    pub fn with_result_path(mut self, result_path: impl Into<String>) -> Self {
        self.result_path = Some(result_path.into());
        self
    }

    /// Attach error text.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

// ---------------------------------------------------------------------------
// StatusBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for task status events.
///
/// Wraps a [`broadcast::Sender`] so any number of consumers can
/// independently receive every published event. Publishing never blocks:
/// when the buffer is full the oldest un-consumed events are dropped and a
/// slow receiver observes `RecvError::Lagged` instead of stalling the
/// producer.
pub struct StatusBus {
    sender: broadcast::Sender<TaskStatusEvent>,
}

impl StatusBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With zero receivers the event is silently dropped -- the task row in
    /// the store remains the source of truth and pollers see the same
    /// status the event carried.
    pub fn publish(&self, event: TaskStatusEvent) {
        // SendError only means there are no receivers right now.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskStatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
