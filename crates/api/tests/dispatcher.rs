//! Integration tests for the task dispatch pipeline.
//!
//! The dispatcher runs against a stub worker bound to an ephemeral local
//! port and an in-memory task store, so the full preflight/submit/retry
//! flow is exercised without a database or a real algorithm service.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;

use geosense_algo::AlgoApi;
use geosense_api::engine::{DispatchConfig, TaskDispatcher, TaskStore};
use geosense_core::retry::RetryPolicy;
use geosense_core::status::{FailureKind, TaskStatus};
use geosense_events::{StatusBus, TaskStatusEvent};

use common::{spawn_stub_worker, unused_port_addr, MemoryTaskStore};

/// Retry interval used throughout: short enough for fast tests, long
/// enough to measure.
const INTERVAL: Duration = Duration::from_millis(10);

/// Generous upper bound for waiting on a published event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

const TASK_ID: i64 = 77;

fn make_dispatcher(
    store: Arc<MemoryTaskStore>,
    worker_addr: SocketAddr,
    submit_attempts: u32,
    health_retries: u32,
) -> (TaskDispatcher, Arc<StatusBus>) {
    let worker = Arc::new(AlgoApi::with_timeout(
        format!("http://{worker_addr}"),
        "/api/train/start".into(),
        "/api/train/health".into(),
        Duration::from_secs(2),
    ));
    let bus = Arc::new(StatusBus::default());
    let config = DispatchConfig {
        preflight: RetryPolicy::preflight(health_retries, INTERVAL),
        submit: RetryPolicy::submit(submit_attempts, INTERVAL),
    };
    let dispatcher = TaskDispatcher::new(
        store,
        worker,
        Arc::clone(&bus),
        config,
        4,
        CancellationToken::new(),
    );
    (dispatcher, bus)
}

async fn recv_event(
    rx: &mut tokio::sync::broadcast::Receiver<TaskStatusEvent>,
) -> TaskStatusEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a status event")
        .expect("bus closed unexpectedly")
}

// ---------------------------------------------------------------------------
// Test: accepted submission marks the task running
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accepted_submission_marks_running() {
    let (addr, hits) = spawn_stub_worker(StatusCode::OK, StatusCode::OK).await;
    let store = Arc::new(MemoryTaskStore::pending());
    let (dispatcher, bus) = make_dispatcher(Arc::clone(&store), addr, 3, 0);
    let mut rx = bus.subscribe();

    dispatcher.dispatch(TASK_ID);

    let event = recv_event(&mut rx).await;
    assert_eq!(event.task_id, TASK_ID);
    assert_eq!(event.status, TaskStatus::Running);

    // Write-then-publish: by the time the event is observable, the store
    // already holds RUNNING.
    let state = store.snapshot();
    assert_eq!(state.status, TaskStatus::Running);
    assert_eq!(state.attempts, 1);
    assert_eq!(hits.submit.load(Ordering::SeqCst), 1);
    assert_eq!(hits.health.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Test: retry exhaustion on persistent 500s
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retry_exhaustion_on_server_errors() {
    let (addr, hits) = spawn_stub_worker(StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR).await;
    let store = Arc::new(MemoryTaskStore::pending());
    let (dispatcher, bus) = make_dispatcher(Arc::clone(&store), addr, 3, 0);
    let mut rx = bus.subscribe();

    let started = Instant::now();
    dispatcher.dispatch(TASK_ID);

    let event = recv_event(&mut rx).await;
    let elapsed = started.elapsed();

    assert_eq!(event.status, TaskStatus::Failed);
    assert_eq!(event.failure, Some(FailureKind::SubmitFailed));

    // Exactly 3 attempts with 2 sleeps in between.
    assert_eq!(hits.submit.load(Ordering::SeqCst), 3);
    assert!(
        elapsed >= INTERVAL * 2,
        "expected at least two retry waits, elapsed {elapsed:?}"
    );
    assert!(elapsed < EVENT_TIMEOUT, "unexpectedly slow: {elapsed:?}");

    let state = store.snapshot();
    assert_eq!(state.status, TaskStatus::Failed);
    assert_eq!(state.failure, Some(FailureKind::SubmitFailed));
    assert_eq!(state.attempts, 3);
}

// ---------------------------------------------------------------------------
// Test: 404 fails immediately without retrying
// ---------------------------------------------------------------------------

#[tokio::test]
async fn endpoint_not_found_short_circuits() {
    let (addr, hits) = spawn_stub_worker(StatusCode::OK, StatusCode::NOT_FOUND).await;
    let store = Arc::new(MemoryTaskStore::pending());
    let (dispatcher, bus) = make_dispatcher(Arc::clone(&store), addr, 3, 0);
    let mut rx = bus.subscribe();

    dispatcher.dispatch(TASK_ID);

    let event = recv_event(&mut rx).await;
    assert_eq!(event.status, TaskStatus::Failed);
    assert_eq!(event.failure, Some(FailureKind::EndpointNotFound));

    // Never reaches attempt 2.
    assert_eq!(hits.submit.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.snapshot().failure,
        Some(FailureKind::EndpointNotFound)
    );
}

// ---------------------------------------------------------------------------
// Test: a missing reference never touches the network
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_reference_fails_without_submit_call() {
    let (addr, hits) = spawn_stub_worker(StatusCode::OK, StatusCode::OK).await;
    let store = Arc::new(MemoryTaskStore::with_missing_reference(
        "dataset 42 does not exist",
    ));
    let (dispatcher, bus) = make_dispatcher(Arc::clone(&store), addr, 3, 0);
    let mut rx = bus.subscribe();

    dispatcher.dispatch(TASK_ID);

    let event = recv_event(&mut rx).await;
    assert_eq!(event.status, TaskStatus::Failed);
    assert_eq!(event.failure, Some(FailureKind::SubmitFailed));
    assert_eq!(event.error.as_deref(), Some("dataset 42 does not exist"));

    // The precondition failed after the health check; the submit endpoint
    // was never called.
    assert_eq!(hits.submit.load(Ordering::SeqCst), 0);
    assert_eq!(store.snapshot().attempts, 0);
}

// ---------------------------------------------------------------------------
// Test: unreachable worker exhausts the preflight phase as NETWORK_ERROR
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_worker_is_a_network_error() {
    let addr = unused_port_addr().await;
    let store = Arc::new(MemoryTaskStore::pending());
    let (dispatcher, bus) = make_dispatcher(Arc::clone(&store), addr, 3, 1);
    let mut rx = bus.subscribe();

    dispatcher.dispatch(TASK_ID);

    let event = recv_event(&mut rx).await;
    assert_eq!(event.status, TaskStatus::Failed);
    assert_eq!(event.failure, Some(FailureKind::NetworkError));

    // The submit phase was never attempted.
    assert_eq!(store.snapshot().attempts, 0);
}

// ---------------------------------------------------------------------------
// Test: unhealthy worker responses exhaust the preflight as SUBMIT_FAILED
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unhealthy_worker_response_is_submit_failed() {
    let (addr, hits) = spawn_stub_worker(StatusCode::SERVICE_UNAVAILABLE, StatusCode::OK).await;
    let store = Arc::new(MemoryTaskStore::pending());
    let (dispatcher, bus) = make_dispatcher(Arc::clone(&store), addr, 3, 1);
    let mut rx = bus.subscribe();

    dispatcher.dispatch(TASK_ID);

    let event = recv_event(&mut rx).await;
    assert_eq!(event.status, TaskStatus::Failed);
    assert_eq!(event.failure, Some(FailureKind::SubmitFailed));

    // First probe plus one retry.
    assert_eq!(hits.health.load(Ordering::SeqCst), 2);
    assert_eq!(hits.submit.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: terminal writes are idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_terminal_write_is_a_noop() {
    let store = MemoryTaskStore::pending();

    let first = store
        .mark_failed(TASK_ID, FailureKind::NetworkError, "worker unreachable")
        .await
        .expect("first write");
    assert!(first, "first terminal write must land");

    let second = store
        .mark_failed(TASK_ID, FailureKind::SubmitFailed, "late duplicate")
        .await
        .expect("second write");
    assert!(!second, "terminal status must be sticky");

    // The original classification survives the duplicate.
    let state = store.snapshot();
    assert_eq!(state.failure, Some(FailureKind::NetworkError));
    assert_eq!(state.error_message.as_deref(), Some("worker unreachable"));
}

// ---------------------------------------------------------------------------
// Test: a task cancelled mid-flight is not resurrected by acceptance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn terminal_store_state_suppresses_running_event() {
    let (addr, _hits) = spawn_stub_worker(StatusCode::OK, StatusCode::OK).await;
    let store = Arc::new(MemoryTaskStore::pending());

    // Simulate a user cancel landing before the worker accepts.
    store
        .mark_failed(TASK_ID, FailureKind::OtherError, "cancelled in test")
        .await
        .expect("mark_failed");

    let (dispatcher, bus) = make_dispatcher(Arc::clone(&store), addr, 3, 0);
    let mut rx = bus.subscribe();

    dispatcher.dispatch(TASK_ID);

    // No RUNNING event may appear and the terminal state must stand.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err(), "no event expected for a terminal task");
    assert_eq!(store.snapshot().status, TaskStatus::Failed);
}
