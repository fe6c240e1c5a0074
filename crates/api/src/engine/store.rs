//! Task-state persistence seam for the dispatch engine.
//!
//! The dispatcher never touches the database directly: it writes through
//! [`TaskStore`], whose production implementation ([`PgTaskStore`]) wraps
//! the sqlx repositories. Tests substitute an in-memory store.

use async_trait::async_trait;

use geosense_algo::payload::{AnalysisSubmission, TrainingSubmission, WorkerSubmission};
use geosense_core::status::FailureKind;
use geosense_core::types::DbId;
use geosense_db::models::task::{Task, KIND_ANALYSIS, KIND_TRAINING};
use geosense_db::repositories::{DatasetRepo, ImageRepo, ModelRepo, TaskRepo};
use geosense_db::DbPool;

/// Default epochs when the task parameters omit them.
const DEFAULT_EPOCHS: i64 = 30;
/// Default batch size when the task parameters omit it.
const DEFAULT_BATCH_SIZE: i64 = 32;
/// Default learning rate when the task parameters omit it.
const DEFAULT_LEARNING_RATE: f64 = 0.001;

/// Errors surfaced by the task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The task references an entity that no longer exists (or never did).
    /// Non-retryable: dispatch short-circuits without a network call.
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// State operations the dispatcher needs, abstracted from the database.
///
/// All status writes are compare-and-set safe: once a task is terminal no
/// implementation may move it back, and the `bool` returns tell the caller
/// whether the write actually happened (so status events are only
/// published for real transitions).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Resolve the task's referenced entities into a worker payload.
    async fn build_submission(&self, task_id: DbId) -> Result<WorkerSubmission, StoreError>;

    /// Transition a pending task to running. Returns `false` when the task
    /// left `PENDING` in the meantime (e.g. user cancel).
    async fn mark_running(&self, task_id: DbId) -> Result<bool, StoreError>;

    /// Count one submission attempt against the task.
    async fn record_attempt(&self, task_id: DbId) -> Result<(), StoreError>;

    /// Record a terminal dispatch failure. Returns `false` when the task
    /// was already terminal.
    async fn mark_failed(
        &self,
        task_id: DbId,
        kind: FailureKind,
        message: &str,
    ) -> Result<bool, StoreError>;
}

/// Production [`TaskStore`] backed by the sqlx repositories.
pub struct PgTaskStore {
    pool: DbPool,
    /// Root directory for analysis result artifacts; the per-task result
    /// path is `{result_root}/{task_id}`.
    result_root: String,
}

impl PgTaskStore {
    pub fn new(pool: DbPool, result_root: String) -> Self {
        Self { pool, result_root }
    }

    async fn load_task(&self, task_id: DbId) -> Result<Task, StoreError> {
        TaskRepo::find_by_id(&self.pool, task_id)
            .await?
            .ok_or_else(|| StoreError::MissingReference(format!("task {task_id} does not exist")))
    }

    async fn training_submission(&self, task: &Task) -> Result<TrainingSubmission, StoreError> {
        let dataset_id = task.dataset_id.ok_or_else(|| {
            StoreError::MissingReference(format!("task {} has no dataset reference", task.id))
        })?;
        let dataset = DatasetRepo::find_by_id(&self.pool, dataset_id)
            .await?
            .ok_or_else(|| {
                StoreError::MissingReference(format!("dataset {dataset_id} does not exist"))
            })?;

        let params = &task.parameters;
        Ok(TrainingSubmission {
            task_name: task.task_name.clone(),
            dataset_name: dataset.dataset_name,
            model_name: task
                .model_name
                .clone()
                .unwrap_or_else(|| task.task_name.clone()),
            epochs: params["epochs"].as_i64().unwrap_or(DEFAULT_EPOCHS) as i32,
            batch_size: params["batch_size"].as_i64().unwrap_or(DEFAULT_BATCH_SIZE) as i32,
            learning_rate: params["learning_rate"]
                .as_f64()
                .unwrap_or(DEFAULT_LEARNING_RATE),
        })
    }

    async fn analysis_submission(&self, task: &Task) -> Result<AnalysisSubmission, StoreError> {
        let image_id = task.image_id.ok_or_else(|| {
            StoreError::MissingReference(format!("task {} has no image reference", task.id))
        })?;
        let model_id = task.model_id.ok_or_else(|| {
            StoreError::MissingReference(format!("task {} has no model reference", task.id))
        })?;

        let image = ImageRepo::find_by_id(&self.pool, image_id)
            .await?
            .ok_or_else(|| {
                StoreError::MissingReference(format!("image {image_id} does not exist"))
            })?;
        let model = ModelRepo::find_by_id(&self.pool, model_id)
            .await?
            .ok_or_else(|| {
                StoreError::MissingReference(format!("model {model_id} does not exist"))
            })?;

        Ok(AnalysisSubmission {
            task_id: task.id,
            image_path: image.image_path,
            model_path: model.model_path,
            result_path: format!("{}/{}", self.result_root, task.id),
            parameters: task.parameters.clone(),
        })
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn build_submission(&self, task_id: DbId) -> Result<WorkerSubmission, StoreError> {
        let task = self.load_task(task_id).await?;
        match task.kind.as_str() {
            KIND_TRAINING => Ok(WorkerSubmission::Training(
                self.training_submission(&task).await?,
            )),
            KIND_ANALYSIS => Ok(WorkerSubmission::Analysis(
                self.analysis_submission(&task).await?,
            )),
            other => Err(StoreError::MissingReference(format!(
                "task {task_id} has unknown kind \"{other}\""
            ))),
        }
    }

    async fn mark_running(&self, task_id: DbId) -> Result<bool, StoreError> {
        Ok(TaskRepo::mark_running(&self.pool, task_id).await?)
    }

    async fn record_attempt(&self, task_id: DbId) -> Result<(), StoreError> {
        Ok(TaskRepo::record_attempt(&self.pool, task_id).await?)
    }

    async fn mark_failed(
        &self,
        task_id: DbId,
        kind: FailureKind,
        message: &str,
    ) -> Result<bool, StoreError> {
        Ok(TaskRepo::mark_failed(&self.pool, task_id, kind, message).await?)
    }
}
