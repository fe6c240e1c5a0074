//! Classification model entity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use geosense_core::types::{DbId, Timestamp};

/// A row from the `models` table.
///
/// Rows are created two ways: registered directly, or auto-inserted when a
/// training task completes (see `ModelRepo::register_from_training`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClassificationModel {
    pub id: DbId,
    pub user_id: DbId,
    pub model_name: String,
    pub model_path: String,
    pub model_type: Option<String>,
    pub description: Option<String>,
    pub accuracy: Option<f64>,
    pub parameters: Option<serde_json::Value>,
    pub is_default: bool,
    pub is_enabled: bool,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Query parameters for `GET /api/v1/models`.
#[derive(Debug, Deserialize)]
pub struct ModelListQuery {
    /// Only list enabled models (what the analysis form shows).
    pub enabled_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
