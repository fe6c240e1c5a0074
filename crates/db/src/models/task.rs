//! Task entity model and DTOs for the dispatch pipeline.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use geosense_core::status::StatusId;
use geosense_core::types::{DbId, Timestamp};

/// Task kind discriminator: model training.
pub const KIND_TRAINING: &str = "training";
/// Task kind discriminator: image analysis.
pub const KIND_ANALYSIS: &str = "analysis";

/// A row from the `tasks` table.
///
/// `status_id` maps to `geosense_core::status::TaskStatus`; `failure_kind`
/// holds the stored string form of `FailureKind` when the task failed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub task_name: String,
    pub dataset_id: Option<DbId>,
    pub model_name: Option<String>,
    pub model_type: Option<String>,
    pub image_id: Option<DbId>,
    pub model_id: Option<DbId>,
    pub parameters: serde_json::Value,
    pub status_id: StatusId,
    pub failure_kind: Option<String>,
    pub error_message: Option<String>,
    pub progress: i16,
    pub result_path: Option<String>,
    pub model_path: Option<String>,
    pub accuracy: Option<f64>,
    pub submission_attempts: i32,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for `POST /api/v1/tasks/training`.
#[derive(Debug, Deserialize)]
pub struct SubmitTrainingTask {
    pub task_name: String,
    pub dataset_id: DbId,
    pub model_name: String,
    pub model_type: Option<String>,
    pub epochs: Option<i32>,
    pub batch_size: Option<i32>,
    pub learning_rate: Option<f64>,
}

/// DTO for `POST /api/v1/tasks/analysis`.
#[derive(Debug, Deserialize)]
pub struct SubmitAnalysisTask {
    pub task_name: Option<String>,
    pub image_id: DbId,
    pub model_id: DbId,
    pub parameters: Option<serde_json::Value>,
}

/// Query parameters for `GET /api/v1/tasks`.
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    /// Filter by status ID (e.g. 1 = pending, 4 = failed).
    pub status_id: Option<StatusId>,
    /// Filter by task kind (`training` or `analysis`).
    pub kind: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Fields written by the worker status callback.
#[derive(Debug, Deserialize)]
pub struct StatusCallbackQuery {
    pub task_status: String,
    pub progress: Option<i16>,
    pub result_path: Option<String>,
    pub model_path: Option<String>,
    pub accuracy: Option<f64>,
    pub error_message: Option<String>,
}
