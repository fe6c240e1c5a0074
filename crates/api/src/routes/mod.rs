pub mod auth;
pub mod datasets;
pub mod health;
pub mod images;
pub mod models;
pub mod tasks;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket (task status subscriptions)
///
/// /auth/register               register (public)
/// /auth/login                  login (public)
///
/// /tasks                       list, submit (training/analysis)
/// /tasks/{id}                  get, soft-delete
/// /tasks/{id}/cancel           cancel (POST)
/// /tasks/{id}/status           worker status callback (PUT, no auth)
///
/// /datasets                    list, register metadata
/// /datasets/{id}               get, soft-delete
///
/// /models                      list
/// /models/{id}                 get, soft-delete
///
/// /images                      list
/// /images/{id}                 get
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/tasks", tasks::router())
        .nest("/datasets", datasets::router())
        .nest("/models", models::router())
        .nest("/images", images::router())
}
