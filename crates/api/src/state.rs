use std::sync::Arc;

use geosense_algo::AlgoApi;
use geosense_events::{StatusBus, SubscriptionRegistry};

use crate::config::ServerConfig;
use crate::engine::TaskDispatcher;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: geosense_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Per-task subscription membership.
    pub subscriptions: Arc<SubscriptionRegistry>,
    /// Status event bus.
    pub status_bus: Arc<StatusBus>,
    /// Background dispatch engine.
    pub dispatcher: Arc<TaskDispatcher>,
    /// Algorithm service client (used directly for best-effort cancels).
    pub algo: Arc<AlgoApi>,
}
