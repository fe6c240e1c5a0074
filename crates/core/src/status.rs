//! Canonical task lifecycle state machine.
//!
//! The platform historically represented task status three different ways
//! (integer codes on training tasks, string enums on analysis tasks, and a
//! third spelling in the status callback). Everything is unified here:
//! [`TaskStatus`] is the single source of truth, and the legacy encodings
//! are accepted only at the boundary via [`StatusUpdate::parse`] and
//! [`StatusUpdate::from_legacy_code`].

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant from its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Task execution lifecycle status.
    ///
    /// `PENDING → RUNNING → {COMPLETED, FAILED, CANCELED}`. A task may also
    /// fail or be cancelled straight from `PENDING` (dispatch never reached
    /// the worker). The three right-hand states are terminal.
    TaskStatus {
        Pending = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
        Canceled = 5,
    }
}

impl TaskStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Status is monotonic: once terminal, always terminal, and `RUNNING`
    /// never falls back to `PENDING`. Self-transitions are not transitions
    /// (progress updates do not change status).
    pub fn can_transition(self, next: TaskStatus) -> bool {
        match self {
            Self::Pending => next != Self::Pending,
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Failed | Self::Canceled => false,
        }
    }

    /// Canonical wire name (`"PENDING"`, `"RUNNING"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        }
    }
}

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// Classification recorded alongside a `FAILED` status.
///
/// These are not separate lifecycle states: a failed task is `FAILED`, and
/// the kind says why dispatch gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The worker rejected the submission (non-2xx) after retries were
    /// exhausted, or a precondition failed while building the payload.
    SubmitFailed,
    /// The worker route does not exist (HTTP 404). Never retried.
    EndpointNotFound,
    /// Transport-level failure (connection refused, timeout) after
    /// retries were exhausted.
    NetworkError,
    /// Anything that does not fit the categories above.
    OtherError,
}

impl FailureKind {
    /// Stable string form stored in the `failure_kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubmitFailed => "SUBMIT_FAILED",
            Self::EndpointNotFound => "ENDPOINT_NOT_FOUND",
            Self::NetworkError => "NETWORK_ERROR",
            Self::OtherError => "OTHER_ERROR",
        }
    }

    /// Parse the stored string form back into a kind.
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "SUBMIT_FAILED" => Some(Self::SubmitFailed),
            "ENDPOINT_NOT_FOUND" => Some(Self::EndpointNotFound),
            "NETWORK_ERROR" => Some(Self::NetworkError),
            "OTHER_ERROR" => Some(Self::OtherError),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StatusUpdate -- boundary decoding
// ---------------------------------------------------------------------------

/// A decoded status-update request: the canonical status plus an optional
/// failure classification folded out of legacy spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: TaskStatus,
    pub failure: Option<FailureKind>,
}

impl StatusUpdate {
    fn new(status: TaskStatus, failure: Option<FailureKind>) -> Self {
        Self { status, failure }
    }

    /// Decode a status string from the worker callback.
    ///
    /// Accepts the canonical names plus every legacy spelling the old
    /// clients used: `IN_PROGRESS` for running, `CANCELLED` with double L,
    /// and the failure classifications sent as if they were statuses.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::new(TaskStatus::Pending, None)),
            "RUNNING" | "IN_PROGRESS" => Some(Self::new(TaskStatus::Running, None)),
            "COMPLETED" => Some(Self::new(TaskStatus::Completed, None)),
            "FAILED" => Some(Self::new(TaskStatus::Failed, None)),
            "CANCELED" | "CANCELLED" => Some(Self::new(TaskStatus::Canceled, None)),
            other => FailureKind::from_str(other)
                .map(|kind| Self::new(TaskStatus::Failed, Some(kind))),
        }
    }

    /// Decode a v1 legacy integer status code.
    ///
    /// The old training-task table stored these integers; the mapping is
    /// frozen here so stored rows and old callers keep decoding the same
    /// way:
    ///
    /// | code | meaning            | decodes to                   |
    /// |------|--------------------|------------------------------|
    /// | 0    | pending            | `PENDING`                    |
    /// | 1    | in progress        | `RUNNING`                    |
    /// | 2    | completed          | `COMPLETED`                  |
    /// | 3    | failed             | `FAILED`                     |
    /// | 4    | canceled           | `CANCELED`                   |
    /// | 5    | submit failed      | `FAILED` / `SUBMIT_FAILED`   |
    /// | 6    | endpoint not found | `FAILED` / `ENDPOINT_NOT_FOUND` |
    /// | 7    | network error      | `FAILED` / `NETWORK_ERROR`   |
    /// | 8    | other error        | `FAILED` / `OTHER_ERROR`     |
    pub fn from_legacy_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::new(TaskStatus::Pending, None)),
            1 => Some(Self::new(TaskStatus::Running, None)),
            2 => Some(Self::new(TaskStatus::Completed, None)),
            3 => Some(Self::new(TaskStatus::Failed, None)),
            4 => Some(Self::new(TaskStatus::Canceled, None)),
            5 => Some(Self::new(TaskStatus::Failed, Some(FailureKind::SubmitFailed))),
            6 => Some(Self::new(
                TaskStatus::Failed,
                Some(FailureKind::EndpointNotFound),
            )),
            7 => Some(Self::new(TaskStatus::Failed, Some(FailureKind::NetworkError))),
            8 => Some(Self::new(TaskStatus::Failed, Some(FailureKind::OtherError))),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
