use crate::types::DbId;

/// Domain error taxonomy shared by every layer above `core`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced entity is missing or unusable. Surfaced synchronously
    /// to the caller before any task row is created or dispatch starts.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The requested transition conflicts with the task's current
    /// lifecycle state (e.g. cancelling an already-terminal task).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
