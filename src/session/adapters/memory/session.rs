//! In-memory work session repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::session::{
    domain::{WorkSession, WorkSessionId},
    ports::{WorkSessionRepository, WorkSessionRepositoryError, WorkSessionRepositoryResult},
};
use crate::task::domain::TaskId;

/// Thread-safe in-memory work session repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkSessionRepository {
    state: Arc<RwLock<InMemorySessionState>>,
}

#[derive(Debug, Default)]
struct InMemorySessionState {
    sessions: HashMap<WorkSessionId, WorkSession>,
    insertion_order: Vec<WorkSessionId>,
}

impl InMemorySessionState {
    fn live(&self) -> impl Iterator<Item = &WorkSession> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .filter(|session| session.status().is_live())
    }
}

impl InMemoryWorkSessionRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> WorkSessionRepositoryError {
    WorkSessionRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl WorkSessionRepository for InMemoryWorkSessionRepository {
    async fn store(&self, session: &WorkSession) -> WorkSessionRepositoryResult<()> {
        let id = session.id();
        let mut state = self.state.write().map_err(lock_error)?;
        if state.sessions.contains_key(&id) {
            return Err(WorkSessionRepositoryError::Duplicate(id));
        }
        if session.status().is_live()
            && let Some(existing) = state
                .live()
                .find(|live| live.task_id() == session.task_id())
        {
            return Err(WorkSessionRepositoryError::LiveSessionExists {
                task_id: session.task_id(),
                session_id: existing.id(),
            });
        }
        state.insertion_order.push(id);
        state.sessions.insert(id, session.clone());
        Ok(())
    }

    async fn update(&self, session: &WorkSession) -> WorkSessionRepositoryResult<()> {
        let id = session.id();
        let mut state = self.state.write().map_err(lock_error)?;
        let slot = state
            .sessions
            .get_mut(&id)
            .ok_or(WorkSessionRepositoryError::NotFound(id))?;
        *slot = session.clone();
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: WorkSessionId,
    ) -> WorkSessionRepositoryResult<Option<WorkSession>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.sessions.get(&id).cloned())
    }

    async fn find_live_by_task(
        &self,
        task_id: TaskId,
    ) -> WorkSessionRepositoryResult<Option<WorkSession>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .live()
            .find(|session| session.task_id() == task_id)
            .cloned())
    }

    async fn find_live(&self) -> WorkSessionRepositoryResult<Vec<WorkSession>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.live().cloned().collect())
    }
}
