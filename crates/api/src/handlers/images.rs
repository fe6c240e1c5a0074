//! Handlers for the `/images` resource (read-only; upload is handled by
//! the blob-storage service).

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use geosense_core::error::CoreError;
use geosense_core::types::DbId;
use geosense_db::models::image::ImageListQuery;
use geosense_db::repositories::ImageRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/images
pub async fn list_images(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ImageListQuery>,
) -> AppResult<impl IntoResponse> {
    let images = ImageRepo::list_by_user(&state.pool, auth.user_id, &params).await?;
    Ok(Json(DataResponse { data: images }))
}

/// GET /api/v1/images/{id}
pub async fn get_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let image = ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    if image.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another user's image".into(),
        )));
    }

    Ok(Json(DataResponse { data: image }))
}
