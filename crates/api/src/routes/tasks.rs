//! Route definitions for the `/tasks` resource.
//!
//! The status callback is invoked by the algorithm service and carries no
//! auth; every other endpoint requires authentication.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                -> list_tasks
/// POST   /training        -> submit_training
/// POST   /analysis        -> submit_analysis
/// GET    /{id}            -> get_task
/// DELETE /{id}            -> delete_task
/// POST   /{id}/cancel     -> cancel_task
/// PUT    /{id}/status     -> update_task_status (worker callback)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/training", post(tasks::submit_training))
        .route("/analysis", post(tasks::submit_analysis))
        .route("/{id}", get(tasks::get_task).delete(tasks::delete_task))
        .route("/{id}/cancel", post(tasks::cancel_task))
        .route("/{id}/status", put(tasks::update_task_status))
}
