//! Handlers for the `/tasks` resource.
//!
//! Task creation validates its preconditions synchronously, persists a
//! `PENDING` row, hands the id to the dispatcher, and returns immediately;
//! everything after that is observed through polling or a WebSocket
//! subscription. The worker reports back through the unauthenticated
//! status callback (the algorithm service is a trusted internal caller).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use geosense_core::error::CoreError;
use geosense_core::status::{StatusUpdate, TaskStatus};
use geosense_core::types::DbId;
use geosense_core::validate::validate_task_name;
use geosense_db::models::task::{
    StatusCallbackQuery, SubmitAnalysisTask, SubmitTrainingTask, Task, TaskListQuery,
    KIND_TRAINING,
};
use geosense_db::repositories::{DatasetRepo, ImageRepo, ModelRepo, TaskRepo};
use geosense_events::TaskStatusEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a task by ID and verify the caller owns it (or is admin).
///
/// Returns `NotFound` if the task does not exist, `Forbidden` if the caller
/// is not the owner and is not an admin. `action` is used in the error
/// message (e.g. "view", "cancel", "delete").
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    task_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<Task> {
    let task = TaskRepo::find_by_id(pool, task_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))?;

    if task.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's task"
        ))));
    }

    Ok(task)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/training
///
/// Submit a model-training task. The referenced dataset must exist: a
/// dangling reference is rejected here, before any row is created. Returns
/// 201 with the pending task; dispatch continues in the background.
pub async fn submit_training(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitTrainingTask>,
) -> AppResult<impl IntoResponse> {
    validate_task_name(&input.task_name).map_err(AppError::Core)?;

    let dataset = DatasetRepo::find_by_id(&state.pool, input.dataset_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Precondition(format!(
                "dataset {} does not exist",
                input.dataset_id
            )))
        })?;

    let parameters = serde_json::json!({
        "epochs": input.epochs,
        "batch_size": input.batch_size,
        "learning_rate": input.learning_rate,
    });

    let task = TaskRepo::create_training(&state.pool, auth.user_id, &input, &parameters).await?;

    tracing::info!(
        task_id = task.id,
        user_id = auth.user_id,
        dataset = %dataset.dataset_name,
        "Training task created",
    );

    state.dispatcher.dispatch(task.id);

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// POST /api/v1/tasks/analysis
///
/// Submit an image-analysis task. The referenced image must belong to the
/// caller and the model must exist and be enabled.
pub async fn submit_analysis(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitAnalysisTask>,
) -> AppResult<impl IntoResponse> {
    let image = ImageRepo::find_by_id(&state.pool, input.image_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Precondition(format!(
                "image {} does not exist",
                input.image_id
            )))
        })?;

    if image.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot analyse another user's image".into(),
        )));
    }

    let model = ModelRepo::find_by_id(&state.pool, input.model_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Precondition(format!(
                "model {} does not exist",
                input.model_id
            )))
        })?;
    if !model.is_enabled {
        return Err(AppError::Core(CoreError::Precondition(format!(
            "model {} is disabled",
            model.id
        ))));
    }

    let task_name = match &input.task_name {
        Some(name) => {
            validate_task_name(name).map_err(AppError::Core)?;
            name.clone()
        }
        None => format!("{}_{}", image.image_name, model.model_name),
    };

    let task = TaskRepo::create_analysis(&state.pool, auth.user_id, &task_name, &input).await?;

    tracing::info!(
        task_id = task.id,
        user_id = auth.user_id,
        image_id = input.image_id,
        model_id = input.model_id,
        "Analysis task created",
    );

    state.dispatcher.dispatch(task.id);

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

// ---------------------------------------------------------------------------
// List / Get
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks
///
/// List tasks. Admin users see all tasks; regular users see only their
/// own. Supports `status_id`, `kind`, `limit`, and `offset` parameters.
pub async fn list_tasks(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TaskListQuery>,
) -> AppResult<impl IntoResponse> {
    let tasks = if auth.is_admin() {
        TaskRepo::list_all(&state.pool, &params).await?
    } else {
        TaskRepo::list_by_user(&state.pool, auth.user_id, &params).await?
    };

    Ok(Json(DataResponse { data: tasks }))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = find_and_authorize(&state.pool, task_id, &auth, "view").await?;
    Ok(Json(DataResponse { data: task }))
}

// ---------------------------------------------------------------------------
// Cancel / Delete
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/{id}/cancel
///
/// Cancel a pending or running task. Returns 409 if the task is already
/// terminal. The worker is notified best-effort after the row is updated.
pub async fn cancel_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, task_id, &auth, "cancel").await?;

    let cancelled = TaskRepo::cancel(&state.pool, task_id).await?;
    if !cancelled {
        return Err(AppError::Core(CoreError::InvalidState(
            "Task is already in a terminal state and cannot be cancelled".into(),
        )));
    }

    // Row updated; only now tell subscribers.
    state
        .status_bus
        .publish(TaskStatusEvent::new(task_id, TaskStatus::Canceled));

    // Best-effort cancel signal to the worker. A failure here is logged
    // and swallowed: the task is already cancelled in the store, and a
    // late completion callback will be a no-op under the sticky-terminal
    // rule.
    if let Err(e) = state.algo.cancel(task_id).await {
        tracing::warn!(
            task_id,
            error = %e,
            "Failed to notify worker of cancellation",
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/tasks/{id}
///
/// Soft-delete a task. A running task cannot be deleted; cancel it first.
pub async fn delete_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = find_and_authorize(&state.pool, task_id, &auth, "delete").await?;

    if TaskStatus::from_id(task.status_id) == Some(TaskStatus::Running) {
        return Err(AppError::Core(CoreError::InvalidState(
            "Task is running and cannot be deleted; cancel it first".into(),
        )));
    }

    TaskRepo::soft_delete(&state.pool, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Worker status callback
// ---------------------------------------------------------------------------

/// PUT /api/v1/tasks/{id}/status
///
/// Status-update callback invoked by the algorithm service. Accepts the
/// canonical status names, the legacy spellings, and the v1 integer
/// codes. Terminal writes go
/// through the sticky compare-and-set: the first write wins, a duplicate
/// is a no-op that publishes nothing, and `data` reports whether this call
/// actually changed the row.
pub async fn update_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
    Query(params): Query<StatusCallbackQuery>,
) -> AppResult<impl IntoResponse> {
    // Old worker builds sent the v1 integer codes; current ones send
    // status names. Both decode to the canonical status.
    let update = params
        .task_status
        .parse::<i32>()
        .ok()
        .and_then(StatusUpdate::from_legacy_code)
        .or_else(|| StatusUpdate::parse(&params.task_status))
        .ok_or_else(|| {
            AppError::BadRequest(format!("Unknown task status \"{}\"", params.task_status))
        })?;

    // Ensure the task exists before interpreting the update.
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))?;

    match update.status {
        TaskStatus::Pending => Err(AppError::BadRequest(
            "A task cannot be moved back to PENDING".into(),
        )),

        TaskStatus::Running => {
            // Progress report. Ignored (not an error) when the task is not
            // currently running -- e.g. a late report after cancellation.
            let updated = match params.progress {
                Some(progress) => {
                    let updated =
                        TaskRepo::update_progress(&state.pool, task_id, progress).await?;
                    if updated {
                        state.status_bus.publish(
                            TaskStatusEvent::new(task_id, TaskStatus::Running)
                                .with_progress(progress),
                        );
                    }
                    updated
                }
                None => false,
            };
            Ok(Json(DataResponse { data: updated }))
        }

        terminal => {
            let updated = TaskRepo::set_terminal(
                &state.pool,
                task_id,
                terminal,
                update.failure,
                params.error_message.as_deref(),
                params.result_path.as_deref(),
                params.model_path.as_deref(),
                params.accuracy,
            )
            .await?;

            let Some(updated_task) = updated else {
                // Already terminal: idempotent no-op, nothing published.
                tracing::debug!(task_id, status = %params.task_status, "Duplicate terminal update ignored");
                return Ok(Json(DataResponse { data: false }));
            };

            let mut event = TaskStatusEvent::new(task_id, terminal);
            if let Some(kind) = update.failure {
                event = event.with_failure(kind);
            }
            if let Some(path) = &updated_task.result_path {
                event = event.with_result_path(path.clone());
            }
            if let Some(msg) = &updated_task.error_message {
                event = event.with_error(msg.clone());
            }
            state.status_bus.publish(event);

            // A completed training task registers its model so it becomes
            // selectable for analysis tasks.
            if terminal == TaskStatus::Completed && task.kind == KIND_TRAINING {
                if let Some(model_path) = &updated_task.model_path {
                    match ModelRepo::register_from_training(&state.pool, &updated_task, model_path)
                        .await
                    {
                        Ok(model) => {
                            tracing::info!(task_id, model_id = model.id, "Registered trained model");
                        }
                        Err(e) => {
                            tracing::error!(task_id, error = %e, "Failed to register trained model");
                        }
                    }
                }
            }

            Ok(Json(DataResponse { data: true }))
        }
    }
}
