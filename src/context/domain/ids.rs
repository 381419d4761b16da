//! Identifier types for contexts and delegations.

use crate::task::domain::{BranchId, ProjectId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a context record.
///
/// A context shares the identifier of the entity it describes; the global
/// context uses the fixed [`ContextId::GLOBAL`] singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Singleton identifier of the global context.
    pub const GLOBAL: Self = Self(Uuid::from_u128(1));

    /// Creates a context identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }

    /// Returns `true` for the global singleton.
    #[must_use]
    pub fn is_global(self) -> bool {
        self == Self::GLOBAL
    }
}

impl From<TaskId> for ContextId {
    fn from(value: TaskId) -> Self {
        Self(value.into_inner())
    }
}

impl From<ProjectId> for ContextId {
    fn from(value: ProjectId) -> Self {
        Self(value.into_inner())
    }
}

impl From<BranchId> for ContextId {
    fn from(value: BranchId) -> Self {
        Self(value.into_inner())
    }
}

impl AsRef<Uuid> for ContextId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a delegation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DelegationId(Uuid);

impl DelegationId {
    /// Creates a new random delegation identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a delegation identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for DelegationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DelegationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
