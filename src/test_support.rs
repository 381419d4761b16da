//! Shared fixtures for unit tests: a controllable clock and port mocks.

use crate::context::{
    domain::{
        Context, ContextId, ContextLevel, ContextRef, Delegation, DelegationId, DelegationStatus,
    },
    ports::{
        ContextRepository, ContextRepositoryResult, DelegationRepository,
        DelegationRepositoryResult,
    },
};
use crate::task::{
    domain::{Subtask, SubtaskId, Task, TaskEvent, TaskId},
    ports::{SubtaskRepository, TaskEventError, TaskEventSink, TaskRepository, TaskRepositoryResult},
};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockall::mock;
use std::sync::{Arc, Mutex, PoisonError};

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Starts the clock at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Starts the clock at a fixed, arbitrary instant.
    pub fn start() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid start instant");
        Self::new(start)
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(TimeDelta::seconds(secs));
    }
}

impl mockable::Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

mock! {
    pub Tasks {}

    #[async_trait::async_trait]
    impl TaskRepository for Tasks {
        async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;
        async fn update(&self, task: &Task) -> TaskRepositoryResult<()>;
        async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;
        async fn find_all(&self) -> TaskRepositoryResult<Vec<Task>>;
    }
}

mock! {
    pub Subtasks {}

    #[async_trait::async_trait]
    impl SubtaskRepository for Subtasks {
        async fn store(&self, subtask: &Subtask) -> TaskRepositoryResult<()>;
        async fn update(&self, subtask: &Subtask) -> TaskRepositoryResult<()>;
        async fn find_by_id(&self, id: SubtaskId) -> TaskRepositoryResult<Option<Subtask>>;
        async fn find_by_parent_task_id(
            &self,
            task_id: TaskId,
        ) -> TaskRepositoryResult<Vec<Subtask>>;
    }
}

mock! {
    pub Events {}

    #[async_trait::async_trait]
    impl TaskEventSink for Events {
        async fn publish(&self, event: &TaskEvent) -> Result<(), TaskEventError>;
    }
}

mock! {
    pub Contexts {}

    #[async_trait::async_trait]
    impl ContextRepository for Contexts {
        async fn store(&self, context: &Context) -> ContextRepositoryResult<()>;
        async fn update(
            &self,
            context: &Context,
            expected_version: u64,
        ) -> ContextRepositoryResult<()>;
        async fn find(
            &self,
            level: ContextLevel,
            id: ContextId,
        ) -> ContextRepositoryResult<Option<Context>>;
        async fn find_children(&self, parent: ContextRef) -> ContextRepositoryResult<Vec<Context>>;
        async fn delete(&self, level: ContextLevel, id: ContextId) -> ContextRepositoryResult<()>;
    }
}

mock! {
    pub Delegations {}

    #[async_trait::async_trait]
    impl DelegationRepository for Delegations {
        async fn store(&self, delegation: &Delegation) -> DelegationRepositoryResult<()>;
        async fn update(
            &self,
            delegation: &Delegation,
            expected_status: DelegationStatus,
        ) -> DelegationRepositoryResult<()>;
        async fn find_by_id(
            &self,
            id: DelegationId,
        ) -> DelegationRepositoryResult<Option<Delegation>>;
        async fn find_pending(&self, limit: usize) -> DelegationRepositoryResult<Vec<Delegation>>;
        async fn count_pending(&self) -> DelegationRepositoryResult<usize>;
    }
}

/// Error used to simulate storage outages.
pub fn outage() -> std::io::Error {
    std::io::Error::other("connection refused")
}
