//! Port for publishing task domain events.

use crate::task::domain::TaskEvent;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Sink receiving task events after the state change has been persisted.
#[async_trait]
pub trait TaskEventSink: Send + Sync {
    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns [`TaskEventError`] when the event cannot be recorded.
    async fn publish(&self, event: &TaskEvent) -> Result<(), TaskEventError>;
}

/// Errors returned by event sinks.
#[derive(Debug, Clone, Error)]
pub enum TaskEventError {
    /// Underlying storage or transport failure.
    #[error("event publication failed: {0}")]
    Publish(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskEventError {
    /// Wraps a publication error.
    pub fn publish(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Publish(Arc::new(err))
    }
}
