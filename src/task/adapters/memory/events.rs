//! In-memory event log.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{TaskEvent, TaskEventKind, TaskId},
    ports::{TaskEventError, TaskEventSink},
};

/// Append-only event log kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskEventLog {
    events: Arc<RwLock<Vec<TaskEvent>>>,
}

impl InMemoryTaskEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded event in publication order.
    #[must_use]
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns events for one task with the given kind.
    #[must_use]
    pub fn events_for(&self, task_id: TaskId, kind: TaskEventKind) -> Vec<TaskEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.task_id == task_id && event.kind == kind)
            .collect()
    }
}

#[async_trait]
impl TaskEventSink for InMemoryTaskEventLog {
    async fn publish(&self, event: &TaskEvent) -> Result<(), TaskEventError> {
        let mut events = self
            .events
            .write()
            .map_err(|err| TaskEventError::publish(std::io::Error::other(err.to_string())))?;
        events.push(event.clone());
        Ok(())
    }
}
