//! Repository for the `images` table.

use sqlx::PgPool;

use geosense_core::types::DbId;

use crate::models::image::{ImageListQuery, RemoteImage};

/// Column list for `images` queries.
const COLUMNS: &str = "id, user_id, image_name, image_path, deleted, created_at, updated_at";

const MAX_LIMIT: i64 = 100;
const DEFAULT_LIMIT: i64 = 50;

/// Provides read operations for remote-sensing images. Upload and storage
/// layout are handled by the blob-storage service; this layer only reads
/// the registered metadata.
pub struct ImageRepo;

impl ImageRepo {
    /// Find an image by ID, excluding soft-deleted rows.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<RemoteImage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1 AND NOT deleted");
        sqlx::query_as::<_, RemoteImage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's images.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        params: &ImageListQuery,
    ) -> Result<Vec<RemoteImage>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let query = format!(
            "SELECT {COLUMNS} FROM images \
             WHERE user_id = $1 AND NOT deleted \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, RemoteImage>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
