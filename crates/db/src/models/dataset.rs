//! Training dataset entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use geosense_core::types::{DbId, Timestamp};

/// A row from the `datasets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dataset {
    pub id: DbId,
    pub user_id: DbId,
    pub dataset_name: String,
    pub description: Option<String>,
    pub storage_path: String,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for `POST /api/v1/datasets` (metadata registration; the files
/// themselves live in external blob storage).
#[derive(Debug, Deserialize)]
pub struct CreateDataset {
    pub dataset_name: String,
    pub description: Option<String>,
    pub storage_path: String,
}

/// Query parameters for `GET /api/v1/datasets`.
#[derive(Debug, Deserialize)]
pub struct DatasetListQuery {
    /// Substring match on the dataset name.
    pub name: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
