//! Handlers for the `/datasets` resource.
//!
//! Only metadata lives here; the dataset files themselves are managed by
//! the blob-storage service.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use geosense_core::error::CoreError;
use geosense_core::types::DbId;
use geosense_core::validate::validate_dataset_name;
use geosense_db::models::dataset::{CreateDataset, DatasetListQuery};
use geosense_db::repositories::DatasetRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/datasets
pub async fn create_dataset(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateDataset>,
) -> AppResult<impl IntoResponse> {
    validate_dataset_name(&input.dataset_name).map_err(AppError::Core)?;

    let dataset = DatasetRepo::create(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        dataset_id = dataset.id,
        user_id = auth.user_id,
        name = %dataset.dataset_name,
        "Dataset registered",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: dataset })))
}

/// GET /api/v1/datasets
pub async fn list_datasets(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DatasetListQuery>,
) -> AppResult<impl IntoResponse> {
    let datasets = DatasetRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: datasets }))
}

/// GET /api/v1/datasets/{id}
pub async fn get_dataset(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(dataset_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let dataset = DatasetRepo::find_by_id(&state.pool, dataset_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Dataset",
            id: dataset_id,
        }))?;
    Ok(Json(DataResponse { data: dataset }))
}

/// DELETE /api/v1/datasets/{id}
///
/// Soft-delete. Only the owner or an admin may delete a dataset; tasks
/// created later against the id will fail their precondition check.
pub async fn delete_dataset(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(dataset_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let dataset = DatasetRepo::find_by_id(&state.pool, dataset_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Dataset",
            id: dataset_id,
        }))?;

    if dataset.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot delete another user's dataset".into(),
        )));
    }

    DatasetRepo::soft_delete(&state.pool, dataset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
