//! HTTP client for the external algorithm service.
//!
//! The algorithm service is the black-box compute worker that actually
//! runs model training and image analysis. This crate wraps its three
//! endpoints -- health, submit, cancel -- behind [`AlgoApi`] and maps
//! transport outcomes into the retry classification the dispatcher
//! consumes.

pub mod api;
pub mod payload;

pub use api::{AlgoApi, AlgoApiError, TransportClass};
pub use payload::{AnalysisSubmission, TrainingSubmission, WorkerSubmission};
