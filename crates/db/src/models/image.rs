//! Remote-sensing image entity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use geosense_core::types::{DbId, Timestamp};

/// A row from the `images` table. The binary content lives in external
/// blob storage; this row only carries the path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RemoteImage {
    pub id: DbId,
    pub user_id: DbId,
    pub image_name: String,
    pub image_path: String,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Query parameters for `GET /api/v1/images`.
#[derive(Debug, Deserialize)]
pub struct ImageListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
