//! Repository port for work session persistence.

use crate::session::domain::{WorkSession, WorkSessionId};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for work session repository operations.
pub type WorkSessionRepositoryResult<T> = Result<T, WorkSessionRepositoryError>;

/// Work session persistence contract.
#[async_trait]
pub trait WorkSessionRepository: Send + Sync {
    /// Stores a new session.
    ///
    /// The check that the task has no other active or paused session and the
    /// insert happen atomically.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionRepositoryError::Duplicate`] when the identifier
    /// already exists and [`WorkSessionRepositoryError::LiveSessionExists`]
    /// when a live session is stored for a task that already has one.
    async fn store(&self, session: &WorkSession) -> WorkSessionRepositoryResult<()>;

    /// Persists changes to an existing session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionRepositoryError::NotFound`] when the session does
    /// not exist.
    async fn update(&self, session: &WorkSession) -> WorkSessionRepositoryResult<()>;

    /// Finds a session by identifier.
    async fn find_by_id(&self, id: WorkSessionId)
    -> WorkSessionRepositoryResult<Option<WorkSession>>;

    /// Finds the active or paused session for a task, if any.
    async fn find_live_by_task(
        &self,
        task_id: TaskId,
    ) -> WorkSessionRepositoryResult<Option<WorkSession>>;

    /// Returns every active or paused session, oldest first.
    async fn find_live(&self) -> WorkSessionRepositoryResult<Vec<WorkSession>>;
}

/// Errors returned by work session repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WorkSessionRepositoryError {
    /// A session with the same identifier already exists.
    #[error("duplicate work session identifier: {0}")]
    Duplicate(WorkSessionId),

    /// The session was not found.
    #[error("work session not found: {0}")]
    NotFound(WorkSessionId),

    /// The task already has an active or paused session.
    #[error("task {task_id} already has live session {session_id}")]
    LiveSessionExists {
        /// Task being worked.
        task_id: TaskId,
        /// Session holding the task.
        session_id: WorkSessionId,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkSessionRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
