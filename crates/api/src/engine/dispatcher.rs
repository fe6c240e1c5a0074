//! Background task dispatcher.
//!
//! [`TaskDispatcher::dispatch`] returns immediately; the health check,
//! submission, and every retry sleep happen on a spawned tokio task gated
//! by a semaphore, so the number of concurrent dispatches is bounded and a
//! client-facing request never waits on worker I/O.
//!
//! Per task exactly one dispatch runs: dispatch is triggered once when the
//! task is created and never re-triggered for a running task. Every state
//! change is written to the store first and published to the status bus
//! only after the write landed, so a poller and a bus subscriber can never
//! disagree about a status the subscriber has already seen.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use geosense_algo::{AlgoApi, AlgoApiError, TransportClass};
use geosense_core::retry::{RetryDecision, RetryPolicy};
use geosense_core::status::{FailureKind, TaskStatus};
use geosense_core::types::DbId;
use geosense_events::{StatusBus, TaskStatusEvent};

use crate::config::AlgoServiceConfig;
use crate::engine::store::{StoreError, TaskStore};

/// Retry policies for the two dispatch phases.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Health-check phase: first probe plus the configured retries.
    pub preflight: RetryPolicy,
    /// Submit phase: the configured total attempt count.
    pub submit: RetryPolicy,
}

impl DispatchConfig {
    /// Derive the phase policies from the worker service configuration.
    pub fn from_algo(cfg: &AlgoServiceConfig) -> Self {
        Self {
            preflight: RetryPolicy::preflight(cfg.health_max_retries, cfg.health_retry_interval),
            submit: RetryPolicy::submit(cfg.submit_max_attempts, cfg.submit_retry_interval),
        }
    }
}

/// Outcome of the preflight phase, carried into failure classification.
enum Preflight {
    Healthy,
    /// Health checking gave up; the task has already been marked failed.
    GaveUp,
}

/// Dispatches created tasks to the external algorithm service.
pub struct TaskDispatcher {
    store: Arc<dyn TaskStore>,
    worker: Arc<AlgoApi>,
    bus: Arc<StatusBus>,
    config: DispatchConfig,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl TaskDispatcher {
    /// Create a dispatcher with a bounded pool of `max_concurrent` slots.
    ///
    /// The `cancel` token aborts retry waits during shutdown; an
    /// interrupted wait is recorded as exhaustion, never silently dropped.
    pub fn new(
        store: Arc<dyn TaskStore>,
        worker: Arc<AlgoApi>,
        bus: Arc<StatusBus>,
        config: DispatchConfig,
        max_concurrent: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            worker,
            bus,
            config,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            cancel,
        }
    }

    /// Hand a newly created task off to the background pipeline.
    ///
    /// Fire-and-forget: returns as soon as the work is queued. When the
    /// pool is saturated the dispatch waits for a free slot inside the
    /// spawned task, still off the request path.
    pub fn dispatch(&self, task_id: DbId) {
        let store = Arc::clone(&self.store);
        let worker = Arc::clone(&self.worker);
        let bus = Arc::clone(&self.bus);
        let permits = Arc::clone(&self.permits);
        let config = self.config;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!(task_id, "Dispatcher pool closed, dropping dispatch");
                    return;
                }
            };

            let run = DispatchRun {
                store,
                worker,
                bus,
                config,
                cancel,
                task_id,
            };
            run.execute().await;
        });
    }
}

/// One dispatch execution for one task. No error escapes [`execute`]:
/// every failure path resolves to a terminal status write.
struct DispatchRun {
    store: Arc<dyn TaskStore>,
    worker: Arc<AlgoApi>,
    bus: Arc<StatusBus>,
    config: DispatchConfig,
    cancel: CancellationToken,
    task_id: DbId,
}

impl DispatchRun {
    async fn execute(self) {
        // Phase 1: preflight health check. On give-up the task is already
        // marked failed and the submit phase is never attempted.
        match self.preflight().await {
            Preflight::Healthy => {}
            Preflight::GaveUp => return,
        }

        // Phase 2: resolve referenced entities into the worker payload.
        // A missing reference is a precondition failure, not a transport
        // problem: fail immediately without touching the network.
        let submission = match self.store.build_submission(self.task_id).await {
            Ok(submission) => submission,
            Err(StoreError::MissingReference(msg)) => {
                tracing::error!(task_id = self.task_id, error = %msg, "Submission precondition failed");
                self.fail(FailureKind::SubmitFailed, &msg).await;
                return;
            }
            Err(StoreError::Database(e)) => {
                tracing::error!(task_id = self.task_id, error = %e, "Failed to build submission");
                self.fail(FailureKind::OtherError, &e.to_string()).await;
                return;
            }
        };

        // Phase 3: submit with bounded retry.
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            tracing::info!(task_id = self.task_id, attempt = attempts, "Submitting task to worker");
            if let Err(e) = self.store.record_attempt(self.task_id).await {
                tracing::error!(task_id = self.task_id, error = %e, "Failed to record attempt");
            }

            let error = match self.worker.submit(&submission).await {
                Ok(()) => {
                    self.mark_running().await;
                    return;
                }
                Err(e) => e,
            };

            let class = error.classify();
            tracing::warn!(
                task_id = self.task_id,
                attempt = attempts,
                worker = self.worker.base_url(),
                error = %error,
                "Worker submission failed",
            );

            // 404 means the worker route itself is missing; retrying the
            // same URL cannot succeed.
            if class == TransportClass::NotFound {
                self.fail(FailureKind::EndpointNotFound, &error.to_string())
                    .await;
                return;
            }

            match self.config.submit.decide(attempts) {
                RetryDecision::Retry(after) => {
                    if !self.sleep_or_cancelled(after).await {
                        self.fail(
                            failure_for(class),
                            &format!("dispatch interrupted during retry wait: {error}"),
                        )
                        .await;
                        return;
                    }
                }
                RetryDecision::GiveUp => {
                    self.fail(failure_for(class), &error.to_string()).await;
                    return;
                }
            }
        }
    }

    /// Loop the worker health probe under the preflight policy.
    async fn preflight(&self) -> Preflight {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            tracing::debug!(task_id = self.task_id, attempt = attempts, "Worker health check");

            let error: AlgoApiError = match self.worker.health().await {
                Ok(()) => return Preflight::Healthy,
                Err(e) => e,
            };

            tracing::warn!(
                task_id = self.task_id,
                attempt = attempts,
                worker = self.worker.base_url(),
                error = %error,
                "Worker health check failed",
            );

            match self.config.preflight.decide(attempts) {
                RetryDecision::Retry(after) => {
                    if !self.sleep_or_cancelled(after).await {
                        self.fail(
                            preflight_failure(&error),
                            &format!("dispatch interrupted during health check wait: {error}"),
                        )
                        .await;
                        return Preflight::GaveUp;
                    }
                }
                RetryDecision::GiveUp => {
                    self.fail(
                        preflight_failure(&error),
                        &format!("worker health check failed: {error}"),
                    )
                    .await;
                    return Preflight::GaveUp;
                }
            }
        }
    }

    /// Sleep for `after`, returning `false` when cancelled instead.
    async fn sleep_or_cancelled(&self, after: std::time::Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(after) => true,
        }
    }

    /// The worker accepted the submission: write RUNNING, then publish.
    async fn mark_running(&self) {
        match self.store.mark_running(self.task_id).await {
            Ok(true) => {
                tracing::info!(task_id = self.task_id, "Task accepted by worker");
                self.bus
                    .publish(TaskStatusEvent::new(self.task_id, TaskStatus::Running));
            }
            Ok(false) => {
                // The task left PENDING while the submission was in
                // flight (user cancel). The terminal status stands.
                tracing::info!(task_id = self.task_id, "Task no longer pending, skipping RUNNING");
            }
            Err(e) => {
                tracing::error!(task_id = self.task_id, error = %e, "Failed to mark task running");
            }
        }
    }

    /// Terminal failure: write the classification, then publish. When the
    /// write affects no row the task was already terminal and no event is
    /// published.
    async fn fail(&self, kind: FailureKind, message: &str) {
        match self.store.mark_failed(self.task_id, kind, message).await {
            Ok(true) => {
                self.bus.publish(
                    TaskStatusEvent::new(self.task_id, TaskStatus::Failed)
                        .with_failure(kind)
                        .with_error(message),
                );
            }
            Ok(false) => {
                tracing::debug!(task_id = self.task_id, "Task already terminal, skipping failure write");
            }
            Err(e) => {
                tracing::error!(task_id = self.task_id, error = %e, "Failed to record dispatch failure");
            }
        }
    }
}

/// Map a transport classification to the recorded failure kind.
fn failure_for(class: TransportClass) -> FailureKind {
    match class {
        TransportClass::NotFound => FailureKind::EndpointNotFound,
        TransportClass::RetryableHttp => FailureKind::SubmitFailed,
        TransportClass::Network => FailureKind::NetworkError,
        TransportClass::Unexpected => FailureKind::OtherError,
    }
}

/// Preflight exhaustion classification: a worker that answered with an
/// error response is a submit failure; one that never answered is a
/// network failure.
fn preflight_failure(error: &AlgoApiError) -> FailureKind {
    if error.is_response() {
        FailureKind::SubmitFailed
    } else {
        FailureKind::NetworkError
    }
}
