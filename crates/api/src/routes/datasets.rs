//! Route definitions for the `/datasets` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::datasets;
use crate::state::AppState;

/// Routes mounted at `/datasets`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(datasets::list_datasets).post(datasets::create_dataset),
        )
        .route(
            "/{id}",
            get(datasets::get_dataset).delete(datasets::delete_dataset),
        )
}
