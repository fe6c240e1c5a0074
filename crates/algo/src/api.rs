//! REST client for the algorithm service HTTP endpoints.
//!
//! Wraps health checking, task submission, and best-effort cancellation
//! using [`reqwest`], and classifies failures for the dispatcher's retry
//! loop.

use std::time::Duration;

use geosense_core::types::DbId;

use crate::payload::WorkerSubmission;

/// Default connect/read timeout for worker calls.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// HTTP client for one algorithm service deployment.
pub struct AlgoApi {
    client: reqwest::Client,
    base_url: String,
    training_path: String,
    health_path: String,
}

/// How a failed worker call should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportClass {
    /// HTTP 404 -- the worker route is missing. Never retried.
    NotFound,
    /// Any other non-2xx response. Retried until the policy gives up.
    ///
    /// Deliberately coarse: only 404 is singled out as non-retryable, so
    /// other 4xx responses take the same path as 5xx.
    RetryableHttp,
    /// Connection-level failure (refused, reset, timeout). Retried.
    Network,
    /// Anything else (request construction, body decode). Retried, but
    /// recorded as an uncategorized failure on exhaustion.
    Unexpected,
}

/// Errors from the algorithm service client.
#[derive(Debug, thiserror::Error)]
pub enum AlgoApiError {
    /// The HTTP request itself failed (connect, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The worker returned a non-2xx status code.
    #[error("Algorithm service error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for logging.
        body: String,
    },
}

impl AlgoApiError {
    /// Map this error into the dispatcher's retry classification.
    pub fn classify(&self) -> TransportClass {
        match self {
            Self::Status { status: 404, .. } => TransportClass::NotFound,
            Self::Status { .. } => TransportClass::RetryableHttp,
            Self::Request(e) if e.is_connect() || e.is_timeout() => TransportClass::Network,
            Self::Request(_) => TransportClass::Unexpected,
        }
    }

    /// Whether the failure was carried by an HTTP response (as opposed to
    /// never reaching the worker at all).
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

impl AlgoApi {
    /// Create a client with the default 15-second timeout.
    ///
    /// * `base_url`      - e.g. `http://algo:5000` (no trailing slash).
    /// * `training_path` - training submit route, e.g. `/api/train/start`.
    /// * `health_path`   - health route, e.g. `/api/train/health`.
    pub fn new(base_url: String, training_path: String, health_path: String) -> Self {
        Self::with_timeout(
            base_url,
            training_path,
            health_path,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client with an explicit connect/read timeout.
    pub fn with_timeout(
        base_url: String,
        training_path: String,
        health_path: String,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .expect("failed to build algorithm service HTTP client");
        Self {
            client,
            base_url,
            training_path,
            health_path,
        }
    }

    /// Base URL of the worker (for log context).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the worker's health endpoint. 2xx means available.
    pub async fn health(&self) -> Result<(), AlgoApiError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, self.health_path))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Submit a resolved task payload to the matching worker endpoint.
    pub async fn submit(&self, submission: &WorkerSubmission) -> Result<(), AlgoApiError> {
        let response = match submission {
            WorkerSubmission::Training(body) => {
                self.client
                    .post(format!("{}{}", self.base_url, self.training_path))
                    .json(body)
                    .send()
                    .await?
            }
            WorkerSubmission::Analysis(body) => {
                self.client
                    .post(format!("{}/task/submit", self.base_url))
                    .json(body)
                    .send()
                    .await?
            }
        };
        Self::check_status(response).await
    }

    /// Ask the worker to stop a task. Best-effort: the caller logs failures
    /// and proceeds -- the task is already marked cancelled in the store.
    pub async fn cancel(&self, task_id: DbId) -> Result<(), AlgoApiError> {
        let response = self
            .client
            .post(format!("{}/task/cancel/{}", self.base_url, task_id))
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- private helpers ----

    /// Assert the response has a success status code, mapping non-2xx into
    /// [`AlgoApiError::Status`] with the body text preserved for logs.
    async fn check_status(response: reqwest::Response) -> Result<(), AlgoApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AlgoApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_never_retryable() {
        let err = AlgoApiError::Status {
            status: 404,
            body: "no such route".into(),
        };
        assert_eq!(err.classify(), TransportClass::NotFound);
        assert!(err.is_response());
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = AlgoApiError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.classify(), TransportClass::RetryableHttp);
    }

    #[test]
    fn other_client_errors_fall_through_to_retryable() {
        // Only 404 short-circuits; a 400 takes the generic retryable path.
        let err = AlgoApiError::Status {
            status: 400,
            body: "bad request".into(),
        };
        assert_eq!(err.classify(), TransportClass::RetryableHttp);
    }
}
