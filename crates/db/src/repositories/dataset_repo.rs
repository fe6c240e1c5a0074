//! Repository for the `datasets` table.

use sqlx::PgPool;

use geosense_core::types::DbId;

use crate::models::dataset::{CreateDataset, Dataset, DatasetListQuery};

/// Column list for `datasets` queries.
const COLUMNS: &str = "\
    id, user_id, dataset_name, description, storage_path, deleted, \
    created_at, updated_at";

const MAX_LIMIT: i64 = 100;
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for training datasets.
pub struct DatasetRepo;

impl DatasetRepo {
    /// Register a dataset's metadata. The files live in blob storage.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateDataset,
    ) -> Result<Dataset, sqlx::Error> {
        let query = format!(
            "INSERT INTO datasets (user_id, dataset_name, description, storage_path) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(user_id)
            .bind(&input.dataset_name)
            .bind(&input.description)
            .bind(&input.storage_path)
            .fetch_one(pool)
            .await
    }

    /// Find a dataset by ID, excluding soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dataset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM datasets WHERE id = $1 AND NOT deleted");
        sqlx::query_as::<_, Dataset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List datasets with an optional name filter.
    pub async fn list(
        pool: &PgPool,
        params: &DatasetListQuery,
    ) -> Result<Vec<Dataset>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let query = format!(
            "SELECT {COLUMNS} FROM datasets \
             WHERE NOT deleted AND ($1::text IS NULL OR dataset_name ILIKE '%' || $1 || '%') \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(&params.name)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Soft-delete a dataset. Returns `false` if it was already deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE datasets SET deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
