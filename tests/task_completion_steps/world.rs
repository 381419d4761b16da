//! Shared world state for task completion BDD scenarios.

use rstest::fixture;
use stratum::service_context::{InMemoryBackend, ServiceContext};
use stratum::task::{
    domain::{Task, TaskId},
    services::CompletionOutcome,
};

/// Scenario world for task completion behaviour tests.
pub struct CompletionWorld {
    pub services: ServiceContext<InMemoryBackend>,
    pub task: Option<Task>,
    pub dependent_id: Option<TaskId>,
    pub outcome: Option<CompletionOutcome>,
}

impl CompletionWorld {
    /// Creates a world over an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: ServiceContext::new(InMemoryBackend::new()),
            task: None,
            dependent_id: None,
            outcome: None,
        }
    }

    /// Returns the identifier of the scenario's main task.
    pub fn task_id(&self) -> Result<TaskId, eyre::Report> {
        self.task
            .as_ref()
            .map(Task::id)
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Returns the recorded completion outcome.
    pub fn outcome(&self) -> Result<&CompletionOutcome, eyre::Report> {
        self.outcome
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing completion outcome"))
    }
}

impl Default for CompletionWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> CompletionWorld {
    CompletionWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
