//! WebSocket infrastructure for live task status delivery.
//!
//! Provides connection management, heartbeat monitoring, and the HTTP
//! upgrade handler used by Axum routes. Task subscriptions declared over a
//! connection are tracked in the shared
//! [`SubscriptionRegistry`](geosense_events::SubscriptionRegistry).

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
