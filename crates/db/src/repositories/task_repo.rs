//! Repository for the `tasks` table.
//!
//! All status transitions go through compare-and-set UPDATEs guarded on the
//! current status, so a terminal status is sticky no matter how many
//! callers race: the first writer wins and every later write affects zero
//! rows.

use sqlx::PgPool;

use geosense_core::status::{FailureKind, StatusId, TaskStatus};
use geosense_core::types::DbId;

use crate::models::task::{SubmitAnalysisTask, SubmitTrainingTask, Task, TaskListQuery};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, user_id, kind, task_name, dataset_id, model_name, model_type, \
    image_id, model_id, parameters, status_id, failure_kind, error_message, \
    progress, result_path, model_path, accuracy, submission_attempts, \
    started_at, completed_at, deleted, created_at, updated_at";

/// Maximum page size for task listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for task listing.
const DEFAULT_LIMIT: i64 = 50;

/// Terminal statuses: completed, failed, canceled.
const TERMINAL_STATUSES: [StatusId; 3] = [
    TaskStatus::Completed as StatusId,
    TaskStatus::Failed as StatusId,
    TaskStatus::Canceled as StatusId,
];

/// Provides CRUD and lifecycle operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new pending training task.
    pub async fn create_training(
        pool: &PgPool,
        user_id: DbId,
        input: &SubmitTrainingTask,
        parameters: &serde_json::Value,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                 (user_id, kind, task_name, dataset_id, model_name, model_type, \
                  parameters, status_id) \
             VALUES ($1, 'training', $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(&input.task_name)
            .bind(input.dataset_id)
            .bind(&input.model_name)
            .bind(&input.model_type)
            .bind(parameters)
            .bind(TaskStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Insert a new pending analysis task.
    pub async fn create_analysis(
        pool: &PgPool,
        user_id: DbId,
        task_name: &str,
        input: &SubmitAnalysisTask,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                 (user_id, kind, task_name, image_id, model_id, parameters, status_id) \
             VALUES ($1, 'analysis', $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(task_name)
            .bind(input.image_id)
            .bind(input.model_id)
            .bind(input.parameters.clone().unwrap_or_else(|| serde_json::json!({})))
            .bind(TaskStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Find a task by its ID, excluding soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 AND NOT deleted");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a pending task as running once the worker accepted it.
    ///
    /// Returns `false` when the task is no longer pending (e.g. the user
    /// cancelled it while the submission was in flight) -- the caller must
    /// then skip the status-event publish.
    pub async fn mark_running(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(TaskStatus::Running.id())
        .bind(TaskStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count one more submission attempt against the task.
    pub async fn record_attempt(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks \
             SET submission_attempts = submission_attempts + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update the progress percentage of a running task.
    ///
    /// Returns `false` when the task is not running (a progress report for
    /// a terminal task is ignored, not an error).
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        progress: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET progress = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(progress)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a non-terminal task into a terminal status.
    ///
    /// Terminal status is sticky: when the task is already terminal this
    /// affects zero rows and `None` is returned, which callers treat as an
    /// idempotent no-op (no second status event is published). On success
    /// the updated row is returned so callers can act on it (e.g. register
    /// the trained model).
    #[allow(clippy::too_many_arguments)]
    pub async fn set_terminal(
        pool: &PgPool,
        id: DbId,
        status: TaskStatus,
        failure_kind: Option<FailureKind>,
        error_message: Option<&str>,
        result_path: Option<&str>,
        model_path: Option<&str>,
        accuracy: Option<f64>,
    ) -> Result<Option<Task>, sqlx::Error> {
        debug_assert!(status.is_terminal());
        let query = format!(
            "UPDATE tasks \
             SET status_id = $2, failure_kind = $3, error_message = $4, \
                 result_path = COALESCE($5, result_path), \
                 model_path = COALESCE($6, model_path), \
                 accuracy = COALESCE($7, accuracy), \
                 progress = CASE WHEN $2 = $8 THEN 100 ELSE progress END, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status.id())
            .bind(failure_kind.map(FailureKind::as_str))
            .bind(error_message)
            .bind(result_path)
            .bind(model_path)
            .bind(accuracy)
            .bind(TaskStatus::Completed.id())
            .bind(TERMINAL_STATUSES[0])
            .bind(TERMINAL_STATUSES[1])
            .bind(TERMINAL_STATUSES[2])
            .fetch_optional(pool)
            .await
    }

    /// Record a dispatch failure with its classification.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        kind: FailureKind,
        message: &str,
    ) -> Result<bool, sqlx::Error> {
        let updated = Self::set_terminal(
            pool,
            id,
            TaskStatus::Failed,
            Some(kind),
            Some(message),
            None,
            None,
            None,
        )
        .await?;
        Ok(updated.is_some())
    }

    /// Cancel a task if it is not already in a terminal state.
    ///
    /// Returns `false` if the task was already completed, failed, or
    /// canceled.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let updated = Self::set_terminal(
            pool,
            id,
            TaskStatus::Canceled,
            None,
            None,
            None,
            None,
            None,
        )
        .await?;
        Ok(updated.is_some())
    }

    /// Soft-delete a task. Returns `false` if it was already deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List tasks for a specific user with optional filters and pagination.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        params: &TaskListQuery,
    ) -> Result<Vec<Task>, sqlx::Error> {
        Self::list_tasks(pool, Some(user_id), params).await
    }

    /// List all tasks (admin view) with optional filters and pagination.
    pub async fn list_all(
        pool: &PgPool,
        params: &TaskListQuery,
    ) -> Result<Vec<Task>, sqlx::Error> {
        Self::list_tasks(pool, None, params).await
    }

    /// Shared listing query builder. When `user_id` is `Some`, filters to
    /// that user's tasks; when `None`, returns all tasks (admin view).
    async fn list_tasks(
        pool: &PgPool,
        user_id: Option<DbId>,
        params: &TaskListQuery,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let mut conditions: Vec<String> = vec!["NOT deleted".to_string()];
        let mut bind_idx: u32 = 1;

        if user_id.is_some() {
            conditions.push(format!("user_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.kind.is_some() {
            conditions.push(format!("kind = ${bind_idx}"));
            bind_idx += 1;
        }

        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE {} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            conditions.join(" AND "),
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Task>(&query);
        if let Some(uid) = user_id {
            q = q.bind(uid);
        }
        if let Some(sid) = params.status_id {
            q = q.bind(sid);
        }
        if let Some(kind) = &params.kind {
            q = q.bind(kind);
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }
}
