//! Error types for the context hierarchy domain.

use super::{ContextId, ContextLevel, DelegationId, DelegationStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating contexts and delegations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextDomainError {
    /// The global context must use the singleton identifier.
    #[error("global context must use the singleton identifier, got {0}")]
    InvalidGlobalId(ContextId),

    /// Only the global context may omit a parent.
    #[error("{0} context requires a parent")]
    MissingParent(ContextLevel),

    /// The global context has no parent.
    #[error("global context cannot have a parent")]
    GlobalWithParent,

    /// The parent does not sit strictly above the child.
    #[error("{parent} context cannot be the parent of a {child} context")]
    InvalidParentLevel {
        /// Level of the context being created.
        child: ContextLevel,
        /// Level of the proposed parent.
        parent: ContextLevel,
    },

    /// Delegation did not move strictly upward.
    #[error("Invalid delegation: must delegate upward in hierarchy ({from} -> {to})")]
    DelegationNotUpward {
        /// Source level.
        from: ContextLevel,
        /// Target level.
        to: ContextLevel,
    },

    /// The delegated payload is empty.
    #[error("No data provided for delegation")]
    EmptyDelegationData,

    /// The requested confidence is outside `[0, 1]`.
    #[error("confidence score {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    /// The delegation already left the pending state.
    #[error("delegation {id} is {status}, expected pending")]
    DelegationNotPending {
        /// Delegation identifier.
        id: DelegationId,
        /// Current status.
        status: DelegationStatus,
    },

    /// A reviewer identifier is blank.
    #[error("reviewer identifier must not be empty")]
    EmptyReviewer,
}

/// Error returned while parsing context levels.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid context level '{0}', expected one of global, project, branch, task")]
pub struct ParseContextLevelError(pub String);

/// Error returned while parsing delegation statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown delegation status: {0}")]
pub struct ParseDelegationStatusError(pub String);

/// Error returned while parsing delegation triggers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown delegation trigger: {0}")]
pub struct ParseDelegationTriggerError(pub String);
