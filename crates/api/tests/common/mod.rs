//! Shared test fixtures: an in-memory `TaskStore` and a stub worker server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

use geosense_algo::payload::{TrainingSubmission, WorkerSubmission};
use geosense_api::engine::{StoreError, TaskStore};
use geosense_core::status::{FailureKind, TaskStatus};
use geosense_core::types::DbId;

// ---------------------------------------------------------------------------
// In-memory task store
// ---------------------------------------------------------------------------

/// Mutable view of one task's dispatch-relevant state.
#[derive(Debug, Clone)]
pub struct TaskState {
    pub status: TaskStatus,
    pub failure: Option<FailureKind>,
    pub error_message: Option<String>,
    pub attempts: u32,
}

/// `TaskStore` implementation holding a single task in memory.
///
/// Mirrors the compare-and-set semantics of the Postgres store: terminal
/// status is sticky and `mark_running` only succeeds from `PENDING`.
pub struct MemoryTaskStore {
    state: Mutex<TaskState>,
    /// `Ok` payload returned by `build_submission`, or the message for a
    /// simulated missing reference.
    submission: Result<WorkerSubmission, String>,
}

impl MemoryTaskStore {
    /// A pending training task whose references all resolve.
    pub fn pending() -> Self {
        Self {
            state: Mutex::new(TaskState {
                status: TaskStatus::Pending,
                failure: None,
                error_message: None,
                attempts: 0,
            }),
            submission: Ok(WorkerSubmission::Training(TrainingSubmission {
                task_name: "forest-cover".into(),
                dataset_name: "landsat_2024".into(),
                model_name: "resnet50".into(),
                epochs: 5,
                batch_size: 16,
                learning_rate: 0.001,
            })),
        }
    }

    /// A pending task whose payload build fails with a missing reference.
    pub fn with_missing_reference(message: &str) -> Self {
        Self {
            submission: Err(message.to_string()),
            ..Self::pending()
        }
    }

    /// Snapshot the current task state.
    pub fn snapshot(&self) -> TaskState {
        self.state.lock().expect("store lock").clone()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn build_submission(&self, _task_id: DbId) -> Result<WorkerSubmission, StoreError> {
        match &self.submission {
            Ok(submission) => Ok(submission.clone()),
            Err(msg) => Err(StoreError::MissingReference(msg.clone())),
        }
    }

    async fn mark_running(&self, _task_id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().expect("store lock");
        if state.status == TaskStatus::Pending {
            state.status = TaskStatus::Running;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn record_attempt(&self, _task_id: DbId) -> Result<(), StoreError> {
        self.state.lock().expect("store lock").attempts += 1;
        Ok(())
    }

    async fn mark_failed(
        &self,
        _task_id: DbId,
        kind: FailureKind,
        message: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().expect("store lock");
        if state.status.is_terminal() {
            return Ok(false);
        }
        state.status = TaskStatus::Failed;
        state.failure = Some(kind);
        state.error_message = Some(message.to_string());
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Stub worker server
// ---------------------------------------------------------------------------

/// Call counters exposed by the stub worker.
#[derive(Default)]
pub struct WorkerHits {
    pub health: AtomicU32,
    pub submit: AtomicU32,
}

#[derive(Clone)]
struct StubConfig {
    hits: Arc<WorkerHits>,
    health_status: StatusCode,
    submit_status: StatusCode,
}

async fn stub_health(State(cfg): State<StubConfig>) -> StatusCode {
    cfg.hits.health.fetch_add(1, Ordering::SeqCst);
    cfg.health_status
}

async fn stub_submit(State(cfg): State<StubConfig>) -> StatusCode {
    cfg.hits.submit.fetch_add(1, Ordering::SeqCst);
    cfg.submit_status
}

/// Spawn a stub worker on an ephemeral local port.
///
/// Serves `GET /api/train/health` and `POST /api/train/start` with the
/// given fixed status codes and counts the calls it receives.
pub async fn spawn_stub_worker(
    health_status: StatusCode,
    submit_status: StatusCode,
) -> (SocketAddr, Arc<WorkerHits>) {
    let hits = Arc::new(WorkerHits::default());
    let cfg = StubConfig {
        hits: Arc::clone(&hits),
        health_status,
        submit_status,
    };

    let app = Router::new()
        .route("/api/train/health", get(stub_health))
        .route("/api/train/start", post(stub_submit))
        .with_state(cfg);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub worker");
    let addr = listener.local_addr().expect("stub worker addr");

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, hits)
}

/// Reserve a local port with nothing listening on it (connection refused).
pub async fn unused_port_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    addr
}
