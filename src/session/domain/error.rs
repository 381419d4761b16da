//! Error types for the work session domain.

use super::{SessionStatus, WorkSessionId};
use thiserror::Error;

/// Errors returned while mutating work sessions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkSessionError {
    /// The agent identifier is blank.
    #[error("agent identifier must not be empty")]
    EmptyAgent,

    /// A resource name is blank.
    #[error("resource name must not be empty")]
    EmptyResource,

    /// A progress message is blank.
    #[error("progress message must not be empty")]
    EmptyProgressMessage,

    /// The progress percentage is above 100.
    #[error("progress percentage {0} exceeds 100")]
    InvalidProgress(u8),

    /// The maximum duration is not positive.
    #[error("maximum session duration must be positive, got {0}s")]
    InvalidMaxDuration(i64),

    /// The session's state does not allow the action.
    #[error("cannot {action} session {session_id} while it is {status}")]
    InvalidTransition {
        /// Session identifier.
        session_id: WorkSessionId,
        /// Current status.
        status: SessionStatus,
        /// Attempted action.
        action: &'static str,
    },
}

/// Error returned while parsing session statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session status: {0}")]
pub struct ParseSessionStatusError(pub String);
