//! WebSocket message type constants for task status events.
//!
//! Used by the notification bridge when pushing status payloads to
//! subscribed connections.

/// Status payload pushed on every task status change.
pub const MSG_TYPE_TASK_STATUS: &str = "task_status";

/// Progress update while a task is running (percentage).
pub const MSG_TYPE_TASK_PROGRESS: &str = "task_progress";
