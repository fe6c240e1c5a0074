//! Status-event delivery to live connections.

mod bridge;

pub use bridge::StatusBridge;
