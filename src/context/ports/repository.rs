//! Repository ports for context and delegation persistence.

use crate::context::domain::{
    Context, ContextId, ContextLevel, ContextRef, Delegation, DelegationId, DelegationStatus,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for context repository operations.
pub type ContextRepositoryResult<T> = Result<T, ContextRepositoryError>;

/// Result type for delegation repository operations.
pub type DelegationRepositoryResult<T> = Result<T, DelegationRepositoryError>;

/// Context persistence contract, keyed by level and identifier.
#[async_trait]
pub trait ContextRepository: Send + Sync {
    /// Stores a new context.
    ///
    /// # Errors
    ///
    /// Returns [`ContextRepositoryError::Duplicate`] when a context with the
    /// same level and identifier already exists.
    async fn store(&self, context: &Context) -> ContextRepositoryResult<()>;

    /// Replaces a context whose stored version equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextRepositoryError::NotFound`] when the context does not
    /// exist and [`ContextRepositoryError::Conflict`] when another writer
    /// moved the stored version on.
    async fn update(&self, context: &Context, expected_version: u64)
    -> ContextRepositoryResult<()>;

    /// Finds a context by level and identifier.
    async fn find(&self, level: ContextLevel, id: ContextId)
    -> ContextRepositoryResult<Option<Context>>;

    /// Returns the direct children of `parent`, oldest first.
    async fn find_children(&self, parent: ContextRef) -> ContextRepositoryResult<Vec<Context>>;

    /// Deletes a context.
    ///
    /// # Errors
    ///
    /// Returns [`ContextRepositoryError::NotFound`] when the context does not
    /// exist.
    async fn delete(&self, level: ContextLevel, id: ContextId) -> ContextRepositoryResult<()>;
}

/// Errors returned by context repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ContextRepositoryError {
    /// A context already exists at this level and identifier.
    #[error("duplicate context: {0}")]
    Duplicate(ContextRef),

    /// The context was not found.
    #[error("context not found: {0}")]
    NotFound(ContextRef),

    /// The stored version changed since it was read.
    #[error("context {context} is at version {actual}, expected {expected}")]
    Conflict {
        /// Context that was written concurrently.
        context: ContextRef,
        /// Version the caller read.
        expected: u64,
        /// Version found in storage.
        actual: u64,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ContextRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Delegation persistence contract.
///
/// Status changes go through [`DelegationRepository::update`], which only
/// succeeds when the stored status still equals `expected_status`. Two
/// reviewers racing on one delegation therefore cannot both apply it.
#[async_trait]
pub trait DelegationRepository: Send + Sync {
    /// Stores a new delegation.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationRepositoryError::Duplicate`] when the identifier
    /// already exists.
    async fn store(&self, delegation: &Delegation) -> DelegationRepositoryResult<()>;

    /// Replaces a delegation whose stored status equals `expected_status`.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationRepositoryError::NotFound`] when the delegation
    /// does not exist and [`DelegationRepositoryError::Conflict`] when its
    /// stored status differs from `expected_status`.
    async fn update(
        &self,
        delegation: &Delegation,
        expected_status: DelegationStatus,
    ) -> DelegationRepositoryResult<()>;

    /// Finds a delegation by identifier.
    async fn find_by_id(&self, id: DelegationId) -> DelegationRepositoryResult<Option<Delegation>>;

    /// Returns up to `limit` pending delegations, oldest first.
    async fn find_pending(&self, limit: usize) -> DelegationRepositoryResult<Vec<Delegation>>;

    /// Counts pending delegations.
    async fn count_pending(&self) -> DelegationRepositoryResult<usize>;
}

/// Errors returned by delegation repository implementations.
#[derive(Debug, Clone, Error)]
pub enum DelegationRepositoryError {
    /// A delegation with the same identifier already exists.
    #[error("duplicate delegation identifier: {0}")]
    Duplicate(DelegationId),

    /// The delegation was not found.
    #[error("delegation not found: {0}")]
    NotFound(DelegationId),

    /// The stored status changed since it was read.
    #[error("delegation {id} is {actual}, expected {expected}")]
    Conflict {
        /// Delegation identifier.
        id: DelegationId,
        /// Status the caller read.
        expected: DelegationStatus,
        /// Status found in storage.
        actual: DelegationStatus,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DelegationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
