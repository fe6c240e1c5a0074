//! Handlers for the `/models` resource.
//!
//! Model rows are created by completed training tasks (see the status
//! callback); this surface is read/delete only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use geosense_core::error::CoreError;
use geosense_core::types::DbId;
use geosense_db::models::model::ModelListQuery;
use geosense_db::repositories::ModelRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/models
pub async fn list_models(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ModelListQuery>,
) -> AppResult<impl IntoResponse> {
    let models = ModelRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: models }))
}

/// GET /api/v1/models/{id}
pub async fn get_model(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(model_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let model = ModelRepo::find_by_id(&state.pool, model_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Model",
            id: model_id,
        }))?;
    Ok(Json(DataResponse { data: model }))
}

/// DELETE /api/v1/models/{id}
pub async fn delete_model(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(model_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let model = ModelRepo::find_by_id(&state.pool, model_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Model",
            id: model_id,
        }))?;

    if model.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot delete another user's model".into(),
        )));
    }

    ModelRepo::soft_delete(&state.pool, model_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
