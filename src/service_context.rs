//! Explicitly constructed service container.
//!
//! A [`Backend`] names one adapter per port. [`ServiceContext`] holds the
//! adapters and the [`EngineConfig`], and builds each service on demand
//! with the configured tunables applied. Nothing is global: embedders
//! create one context per backend and share it by cloning.

use crate::config::EngineConfig;
use crate::context::{
    adapters::{
        memory::{InMemoryContextRepository, InMemoryDelegationRepository},
        postgres::{ContextPgPool, PostgresContextRepository, PostgresDelegationRepository},
    },
    ports::{ContextRepository, DelegationRepository},
    services::{ContextDelegationService, ContextHierarchyService},
};
use crate::session::{
    adapters::{memory::InMemoryWorkSessionRepository, postgres::PostgresWorkSessionRepository},
    ports::WorkSessionRepository,
    services::WorkSessionService,
};
use crate::task::{
    adapters::{
        memory::{InMemorySubtaskRepository, InMemoryTaskEventLog, InMemoryTaskRepository},
        postgres::{PostgresSubtaskRepository, PostgresTaskEventSink, PostgresTaskRepository},
    },
    ports::{SubtaskRepository, TaskEventSink, TaskRepository},
    services::{
        DependencyResolutionService, ProgressScoringService, StatusTransitionService,
        TaskCompletionService, TaskLifecycleService,
    },
};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;

/// Adapter set backing every port.
pub trait Backend: Send + Sync {
    /// Task repository adapter.
    type Tasks: TaskRepository + 'static;
    /// Subtask repository adapter.
    type Subtasks: SubtaskRepository + 'static;
    /// Task event sink adapter.
    type Events: TaskEventSink + 'static;
    /// Context repository adapter.
    type Contexts: ContextRepository + 'static;
    /// Delegation repository adapter.
    type Delegations: DelegationRepository + 'static;
    /// Work session repository adapter.
    type Sessions: WorkSessionRepository + 'static;
    /// Time source.
    type Clock: Clock + Send + Sync + 'static;

    /// Returns the task repository.
    fn tasks(&self) -> Arc<Self::Tasks>;
    /// Returns the subtask repository.
    fn subtasks(&self) -> Arc<Self::Subtasks>;
    /// Returns the task event sink.
    fn events(&self) -> Arc<Self::Events>;
    /// Returns the context repository.
    fn contexts(&self) -> Arc<Self::Contexts>;
    /// Returns the delegation repository.
    fn delegations(&self) -> Arc<Self::Delegations>;
    /// Returns the work session repository.
    fn sessions(&self) -> Arc<Self::Sessions>;
    /// Returns the clock.
    fn clock(&self) -> Arc<Self::Clock>;
}

/// In-process backend for tests and embedded use.
#[derive(Debug, Clone)]
pub struct InMemoryBackend<C = DefaultClock> {
    tasks: Arc<InMemoryTaskRepository>,
    subtasks: Arc<InMemorySubtaskRepository>,
    events: Arc<InMemoryTaskEventLog>,
    contexts: Arc<InMemoryContextRepository>,
    delegations: Arc<InMemoryDelegationRepository>,
    sessions: Arc<InMemoryWorkSessionRepository>,
    clock: Arc<C>,
}

impl InMemoryBackend<DefaultClock> {
    /// Creates an empty backend on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl Default for InMemoryBackend<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> InMemoryBackend<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates an empty backend on a caller-supplied clock.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            tasks: Arc::new(InMemoryTaskRepository::new()),
            subtasks: Arc::new(InMemorySubtaskRepository::new()),
            events: Arc::new(InMemoryTaskEventLog::new()),
            contexts: Arc::new(InMemoryContextRepository::new()),
            delegations: Arc::new(InMemoryDelegationRepository::new()),
            sessions: Arc::new(InMemoryWorkSessionRepository::new()),
            clock,
        }
    }
}

impl<C> Backend for InMemoryBackend<C>
where
    C: Clock + Send + Sync + 'static,
{
    type Tasks = InMemoryTaskRepository;
    type Subtasks = InMemorySubtaskRepository;
    type Events = InMemoryTaskEventLog;
    type Contexts = InMemoryContextRepository;
    type Delegations = InMemoryDelegationRepository;
    type Sessions = InMemoryWorkSessionRepository;
    type Clock = C;

    fn tasks(&self) -> Arc<Self::Tasks> {
        Arc::clone(&self.tasks)
    }

    fn subtasks(&self) -> Arc<Self::Subtasks> {
        Arc::clone(&self.subtasks)
    }

    fn events(&self) -> Arc<Self::Events> {
        Arc::clone(&self.events)
    }

    fn contexts(&self) -> Arc<Self::Contexts> {
        Arc::clone(&self.contexts)
    }

    fn delegations(&self) -> Arc<Self::Delegations> {
        Arc::clone(&self.delegations)
    }

    fn sessions(&self) -> Arc<Self::Sessions> {
        Arc::clone(&self.sessions)
    }

    fn clock(&self) -> Arc<Self::Clock> {
        Arc::clone(&self.clock)
    }
}

/// `PostgreSQL` backend sharing one connection pool across adapters.
#[derive(Clone)]
pub struct PostgresBackend {
    tasks: Arc<PostgresTaskRepository>,
    subtasks: Arc<PostgresSubtaskRepository>,
    events: Arc<PostgresTaskEventSink>,
    contexts: Arc<PostgresContextRepository>,
    delegations: Arc<PostgresDelegationRepository>,
    sessions: Arc<PostgresWorkSessionRepository>,
    clock: Arc<DefaultClock>,
}

impl PostgresBackend {
    /// Creates the adapters over `pool`.
    #[must_use]
    pub fn new(pool: &ContextPgPool) -> Self {
        Self {
            tasks: Arc::new(PostgresTaskRepository::new(pool.clone())),
            subtasks: Arc::new(PostgresSubtaskRepository::new(pool.clone())),
            events: Arc::new(PostgresTaskEventSink::new(pool.clone())),
            contexts: Arc::new(PostgresContextRepository::new(pool.clone())),
            delegations: Arc::new(PostgresDelegationRepository::new(pool.clone())),
            sessions: Arc::new(PostgresWorkSessionRepository::new(pool.clone())),
            clock: Arc::new(DefaultClock),
        }
    }
}

impl Backend for PostgresBackend {
    type Tasks = PostgresTaskRepository;
    type Subtasks = PostgresSubtaskRepository;
    type Events = PostgresTaskEventSink;
    type Contexts = PostgresContextRepository;
    type Delegations = PostgresDelegationRepository;
    type Sessions = PostgresWorkSessionRepository;
    type Clock = DefaultClock;

    fn tasks(&self) -> Arc<Self::Tasks> {
        Arc::clone(&self.tasks)
    }

    fn subtasks(&self) -> Arc<Self::Subtasks> {
        Arc::clone(&self.subtasks)
    }

    fn events(&self) -> Arc<Self::Events> {
        Arc::clone(&self.events)
    }

    fn contexts(&self) -> Arc<Self::Contexts> {
        Arc::clone(&self.contexts)
    }

    fn delegations(&self) -> Arc<Self::Delegations> {
        Arc::clone(&self.delegations)
    }

    fn sessions(&self) -> Arc<Self::Sessions> {
        Arc::clone(&self.sessions)
    }

    fn clock(&self) -> Arc<Self::Clock> {
        Arc::clone(&self.clock)
    }
}

/// Request-scoped service container.
#[derive(Debug, Clone)]
pub struct ServiceContext<B> {
    backend: B,
    config: EngineConfig,
}

impl<B: Backend> ServiceContext<B> {
    /// Wraps a backend with the default configuration.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    /// Wraps a backend with an explicit configuration.
    #[must_use]
    pub const fn with_config(backend: B, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    /// Returns the backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds the task lifecycle service.
    #[must_use]
    pub fn task_lifecycle(
        &self,
    ) -> TaskLifecycleService<B::Tasks, B::Subtasks, B::Events, B::Clock> {
        TaskLifecycleService::new(
            self.backend.tasks(),
            self.backend.subtasks(),
            self.backend.events(),
            self.backend.clock(),
        )
        .with_limits(self.config.limits)
    }

    /// Builds the status transition validator.
    #[must_use]
    pub fn transitions(&self) -> StatusTransitionService<B::Subtasks, B::Clock> {
        StatusTransitionService::new(self.backend.subtasks(), self.backend.clock())
    }

    /// Builds the progress scoring service.
    #[must_use]
    pub fn progress(&self) -> ProgressScoringService<B::Subtasks> {
        ProgressScoringService::with_weights(self.backend.subtasks(), self.config.scoring)
    }

    /// Builds the dependency resolution service.
    #[must_use]
    pub fn dependencies(&self) -> DependencyResolutionService<B::Tasks, B::Clock> {
        DependencyResolutionService::new(self.backend.tasks(), self.backend.clock())
    }

    /// Builds the task completion service.
    #[must_use]
    pub fn completion(
        &self,
    ) -> TaskCompletionService<B::Tasks, B::Subtasks, B::Contexts, B::Events, B::Clock> {
        TaskCompletionService::new(
            self.backend.tasks(),
            self.backend.subtasks(),
            self.backend.contexts(),
            self.backend.events(),
            self.backend.clock(),
        )
        .with_policy(self.config.completion)
    }

    /// Builds the context hierarchy service.
    #[must_use]
    pub fn hierarchy(&self) -> ContextHierarchyService<B::Contexts, B::Clock> {
        ContextHierarchyService::new(self.backend.contexts(), self.backend.clock())
    }

    /// Builds the delegation service.
    #[must_use]
    pub fn delegation(
        &self,
    ) -> ContextDelegationService<B::Contexts, B::Delegations, B::Tasks, B::Clock> {
        ContextDelegationService::new(
            self.backend.contexts(),
            self.backend.delegations(),
            self.backend.tasks(),
            self.backend.clock(),
        )
        .with_config(self.config.delegation.clone())
    }

    /// Builds the work session service.
    #[must_use]
    pub fn sessions(&self) -> WorkSessionService<B::Sessions, B::Tasks, B::Clock> {
        WorkSessionService::new(
            self.backend.sessions(),
            self.backend.tasks(),
            self.backend.clock(),
        )
    }
}
