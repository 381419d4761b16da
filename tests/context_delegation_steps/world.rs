//! Shared world state for context delegation BDD scenarios.

use rstest::fixture;
use serde_json::{Map, Value};
use stratum::context::{
    domain::{ContextId, ContextLevel, DelegationRequest},
    services::DelegationResult,
};
use stratum::service_context::{InMemoryBackend, ServiceContext};

/// Scenario world for delegation behaviour tests.
pub struct DelegationWorld {
    pub services: ServiceContext<InMemoryBackend>,
    pub project: Option<ContextId>,
    pub task: Option<ContextId>,
    pub last_delegation: Option<DelegationResult>,
    pub last_review: Option<DelegationResult>,
}

impl DelegationWorld {
    /// Creates a world over an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: ServiceContext::new(InMemoryBackend::new()),
            project: None,
            task: None,
            last_delegation: None,
            last_review: None,
        }
    }

    /// Returns the project context identifier.
    pub fn project(&self) -> Result<ContextId, eyre::Report> {
        self.project
            .ok_or_else(|| eyre::eyre!("missing project context in scenario world"))
    }

    /// Returns the task context identifier.
    pub fn task(&self) -> Result<ContextId, eyre::Report> {
        self.task
            .ok_or_else(|| eyre::eyre!("missing task context in scenario world"))
    }

    /// Submits a single-key delegation and records the result.
    pub fn delegate(
        &mut self,
        source: (ContextLevel, ContextId),
        target_level: ContextLevel,
        key: String,
        value: String,
    ) {
        let mut data = Map::new();
        data.insert(key, Value::String(value));
        let request =
            DelegationRequest::new(source.0, source.1, target_level, data, "scenario insight");
        let result = run_async(self.services.delegation().process_delegation(request));
        self.last_delegation = Some(result);
    }
}

impl Default for DelegationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DelegationWorld {
    DelegationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
