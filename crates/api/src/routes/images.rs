//! Route definitions for the `/images` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(images::list_images))
        .route("/{id}", get(images::get_image))
}
