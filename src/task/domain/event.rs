//! Domain events emitted by task use cases.

use super::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Kind of task event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// A task was created.
    TaskCreated,
    /// A task was changed outside the normal completion path.
    TaskUpdated,
    /// A task completed through the validated path.
    TaskCompleted,
    /// A blocked task returned to `todo` after its dependencies finished.
    TaskUnblocked,
}

impl TaskEventKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskUpdated => "task_updated",
            Self::TaskCompleted => "task_completed",
            Self::TaskUnblocked => "task_unblocked",
        }
    }
}

impl fmt::Display for TaskEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event record with free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Task the event concerns.
    pub task_id: TaskId,
    /// Event kind.
    pub kind: TaskEventKind,
    /// Structured metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

impl TaskEvent {
    /// Creates an event with empty metadata.
    #[must_use]
    pub fn new(task_id: TaskId, kind: TaskEventKind, clock: &impl Clock) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            task_id,
            kind,
            metadata: Map::new(),
            occurred_at: clock.utc(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a metadata entry by key.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}
