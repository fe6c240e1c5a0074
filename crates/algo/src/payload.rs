//! Request payloads for the algorithm service submit endpoints.

use serde::Serialize;

use geosense_core::types::DbId;

/// Body for a model-training submission (`POST {base}{training_path}`).
///
/// Field names follow the algorithm service's wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSubmission {
    pub task_name: String,
    pub dataset_name: String,
    pub model_name: String,
    pub epochs: i32,
    pub batch_size: i32,
    pub learning_rate: f64,
}

/// Body for an image-analysis submission (`POST {base}/task/submit`).
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSubmission {
    pub task_id: DbId,
    pub image_path: String,
    pub model_path: String,
    pub result_path: String,
    pub parameters: serde_json::Value,
}

/// A fully resolved submission, ready to post to the worker.
///
/// Built by the task store from the task row and its referenced entities;
/// the dispatcher treats it as opaque and only routes it to the right
/// endpoint.
#[derive(Debug, Clone)]
pub enum WorkerSubmission {
    Training(TrainingSubmission),
    Analysis(AnalysisSubmission),
}
