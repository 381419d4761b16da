//! Service layer for agent work sessions.

use crate::session::{
    domain::{WorkSession, WorkSessionError, WorkSessionId},
    ports::{WorkSessionRepository, WorkSessionRepositoryError},
};
use crate::task::{
    domain::TaskId,
    ports::{TaskRepository, TaskRepositoryError},
};
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level errors for work session operations.
#[derive(Debug, Clone, Error)]
pub enum WorkSessionServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] WorkSessionError),
    /// Session storage failed.
    #[error(transparent)]
    Repository(#[from] WorkSessionRepositoryError),
    /// Task lookup failed.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),
    /// The task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The session does not exist.
    #[error("work session not found: {0}")]
    NotFound(WorkSessionId),
    /// The task already has an active or paused session.
    #[error("task {task_id} already has live session {session_id}")]
    SessionAlreadyActive {
        /// Task being worked.
        task_id: TaskId,
        /// Session holding the task.
        session_id: WorkSessionId,
    },
}

/// Result type for work session service operations.
pub type WorkSessionServiceResult<T> = Result<T, WorkSessionServiceError>;

/// Work session orchestration service.
#[derive(Clone)]
pub struct WorkSessionService<W, R, C>
where
    W: WorkSessionRepository,
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    sessions: Arc<W>,
    tasks: Arc<R>,
    clock: Arc<C>,
}

impl<W, R, C> WorkSessionService<W, R, C>
where
    W: WorkSessionRepository,
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new work session service.
    #[must_use]
    pub const fn new(sessions: Arc<W>, tasks: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            sessions,
            tasks,
            clock,
        }
    }

    /// Starts a session for `agent_id` on an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::TaskNotFound`] for an unknown task
    /// and [`WorkSessionServiceError::SessionAlreadyActive`] when the task
    /// already has a live session.
    pub async fn start_session(
        &self,
        agent_id: &str,
        task_id: TaskId,
        max_duration: Option<TimeDelta>,
    ) -> WorkSessionServiceResult<WorkSession> {
        if self.tasks.find_by_id(task_id).await?.is_none() {
            return Err(WorkSessionServiceError::TaskNotFound(task_id));
        }
        if let Some(existing) = self.sessions.find_live_by_task(task_id).await? {
            return Err(WorkSessionServiceError::SessionAlreadyActive {
                task_id,
                session_id: existing.id(),
            });
        }

        let session = WorkSession::start(agent_id, task_id, max_duration, &*self.clock)?;
        self.sessions
            .store(&session)
            .await
            .map_err(|err| match err {
                WorkSessionRepositoryError::LiveSessionExists {
                    task_id: held,
                    session_id,
                } => WorkSessionServiceError::SessionAlreadyActive {
                    task_id: held,
                    session_id,
                },
                other => other.into(),
            })?;
        info!(
            session_id = %session.id(),
            task_id = %task_id,
            agent_id = session.agent_id(),
            "work session started"
        );
        Ok(session)
    }

    /// Retrieves a session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Repository`] when lookup fails.
    pub async fn find_session(
        &self,
        session_id: WorkSessionId,
    ) -> WorkSessionServiceResult<Option<WorkSession>> {
        Ok(self.sessions.find_by_id(session_id).await?)
    }

    /// Returns the active or paused session on a task, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Repository`] when lookup fails.
    pub async fn live_session_for_task(
        &self,
        task_id: TaskId,
    ) -> WorkSessionServiceResult<Option<WorkSession>> {
        Ok(self.sessions.find_live_by_task(task_id).await?)
    }

    /// Pauses an active session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Domain`] unless the session is
    /// active.
    pub async fn pause_session(
        &self,
        session_id: WorkSessionId,
    ) -> WorkSessionServiceResult<WorkSession> {
        self.mutate(session_id, |session, clock| session.pause(clock))
            .await
            .map(|(session, ())| session)
    }

    /// Resumes a paused session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Domain`] unless the session is
    /// paused.
    pub async fn resume_session(
        &self,
        session_id: WorkSessionId,
    ) -> WorkSessionServiceResult<WorkSession> {
        self.mutate(session_id, |session, clock| session.resume(clock))
            .await
            .map(|(session, ())| session)
    }

    /// Completes a live session, releasing its locks.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Domain`] once the session has
    /// ended.
    pub async fn complete_session(
        &self,
        session_id: WorkSessionId,
        summary: Option<&str>,
    ) -> WorkSessionServiceResult<WorkSession> {
        let (session, ()) = self
            .mutate(session_id, |session, clock| session.complete(summary, clock))
            .await?;
        info!(session_id = %session_id, "work session completed");
        Ok(session)
    }

    /// Cancels a live session, releasing its locks.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Domain`] once the session has
    /// ended.
    pub async fn cancel_session(
        &self,
        session_id: WorkSessionId,
        reason: Option<&str>,
    ) -> WorkSessionServiceResult<WorkSession> {
        let (session, ()) = self
            .mutate(session_id, |session, clock| session.cancel(reason, clock))
            .await?;
        info!(session_id = %session_id, reason = reason.unwrap_or(""), "work session cancelled");
        Ok(session)
    }

    /// Appends a progress entry.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Domain`] for a blank message, a
    /// percentage above 100, or an ended session.
    pub async fn record_progress(
        &self,
        session_id: WorkSessionId,
        message: &str,
        percentage: Option<u8>,
    ) -> WorkSessionServiceResult<WorkSession> {
        self.mutate(session_id, |session, clock| {
            session.record_progress(message, percentage, clock)
        })
        .await
        .map(|(session, ())| session)
    }

    /// Locks a resource for the session. Returns `false` when it was
    /// already held.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Domain`] for a blank resource or an
    /// ended session.
    pub async fn lock_resource(
        &self,
        session_id: WorkSessionId,
        resource: &str,
    ) -> WorkSessionServiceResult<bool> {
        self.mutate(session_id, |session, clock| session.lock_resource(resource, clock))
            .await
            .map(|(_, locked)| locked)
    }

    /// Releases a resource lock. Returns `false` when it was not held.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::NotFound`] for an unknown session.
    pub async fn release_resource(
        &self,
        session_id: WorkSessionId,
        resource: &str,
    ) -> WorkSessionServiceResult<bool> {
        self.mutate(session_id, |session, clock| {
            Ok(session.release_resource(resource, clock))
        })
        .await
        .map(|(_, released)| released)
    }

    /// Marks every live session past its maximum duration as timed out.
    ///
    /// Sessions that fail to persist are logged and skipped; the returned
    /// identifiers are the sessions actually expired.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionServiceError::Repository`] when the live sessions
    /// cannot be listed.
    pub async fn expire_overdue_sessions(&self) -> WorkSessionServiceResult<Vec<WorkSessionId>> {
        let live = self.sessions.find_live().await?;
        let mut expired = Vec::new();
        for mut session in live {
            if !session.is_timeout_due(&*self.clock) {
                continue;
            }
            let session_id = session.id();
            if let Err(err) = session.mark_timeout(&*self.clock) {
                debug!(session_id = %session_id, error = %err, "session ended before expiry");
                continue;
            }
            match self.sessions.update(&session).await {
                Ok(()) => {
                    info!(
                        session_id = %session_id,
                        task_id = %session.task_id(),
                        "work session timed out"
                    );
                    expired.push(session_id);
                }
                Err(err) => {
                    warn!(session_id = %session_id, error = %err, "failed to expire work session");
                }
            }
        }
        Ok(expired)
    }

    async fn mutate<T>(
        &self,
        session_id: WorkSessionId,
        apply: impl FnOnce(&mut WorkSession, &C) -> Result<T, WorkSessionError>,
    ) -> WorkSessionServiceResult<(WorkSession, T)> {
        let mut session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or(WorkSessionServiceError::NotFound(session_id))?;
        let before = session.status();
        let value = apply(&mut session, &*self.clock)?;
        self.sessions.update(&session).await?;
        if before != session.status() {
            debug!(
                session_id = %session_id,
                from = %before,
                to = %session.status(),
                "work session status changed"
            );
        }
        Ok((session, value))
    }
}

