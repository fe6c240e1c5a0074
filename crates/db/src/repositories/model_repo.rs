//! Repository for the `models` table.

use sqlx::PgPool;

use geosense_core::types::DbId;

use crate::models::model::{ClassificationModel, ModelListQuery};
use crate::models::task::Task;

/// Column list for `models` queries.
const COLUMNS: &str = "\
    id, user_id, model_name, model_path, model_type, description, accuracy, \
    parameters, is_default, is_enabled, deleted, created_at, updated_at";

const MAX_LIMIT: i64 = 100;
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for classification models.
pub struct ModelRepo;

impl ModelRepo {
    /// Find a model by ID, excluding soft-deleted rows.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ClassificationModel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM models WHERE id = $1 AND NOT deleted");
        sqlx::query_as::<_, ClassificationModel>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List models, optionally restricted to enabled ones.
    pub async fn list(
        pool: &PgPool,
        params: &ModelListQuery,
    ) -> Result<Vec<ClassificationModel>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);
        let enabled_only = params.enabled_only.unwrap_or(false);

        let query = format!(
            "SELECT {COLUMNS} FROM models \
             WHERE NOT deleted AND (NOT $1 OR is_enabled) \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ClassificationModel>(&query)
            .bind(enabled_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Insert a model row from a completed training task.
    ///
    /// Called by the worker status callback when a training task reaches
    /// `COMPLETED` with a reported model path.
    pub async fn register_from_training(
        pool: &PgPool,
        task: &Task,
        model_path: &str,
    ) -> Result<ClassificationModel, sqlx::Error> {
        let query = format!(
            "INSERT INTO models \
                 (user_id, model_name, model_path, model_type, description, \
                  accuracy, parameters) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let description = format!("Model produced by training task \"{}\"", task.task_name);
        sqlx::query_as::<_, ClassificationModel>(&query)
            .bind(task.user_id)
            .bind(task.model_name.as_deref().unwrap_or(&task.task_name))
            .bind(model_path)
            .bind(&task.model_type)
            .bind(description)
            .bind(task.accuracy)
            .bind(&task.parameters)
            .fetch_one(pool)
            .await
    }

    /// Soft-delete a model. Returns `false` if it was already deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE models SET deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
