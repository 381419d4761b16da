//! Diesel row models for task persistence.

use super::schema::{subtasks, task_events, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    pub status: String,
    /// Priority.
    pub priority: String,
    /// Assignees JSON array.
    pub assignees: Value,
    /// Labels JSON array.
    pub labels: Value,
    /// Dependencies JSON array.
    pub dependencies: Value,
    /// Effort estimate.
    pub estimated_effort: Option<String>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Owning project.
    pub project_id: Option<uuid::Uuid>,
    /// Owning branch.
    pub branch_id: Option<uuid::Uuid>,
    /// Linked task context.
    pub context_id: Option<uuid::Uuid>,
    /// Completion summary.
    pub completion_summary: Option<String>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and update model for task records.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    pub status: String,
    /// Priority.
    pub priority: String,
    /// Assignees JSON array.
    pub assignees: Value,
    /// Labels JSON array.
    pub labels: Value,
    /// Dependencies JSON array.
    pub dependencies: Value,
    /// Effort estimate.
    pub estimated_effort: Option<String>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Owning project.
    pub project_id: Option<uuid::Uuid>,
    /// Owning branch.
    pub branch_id: Option<uuid::Uuid>,
    /// Linked task context.
    pub context_id: Option<uuid::Uuid>,
    /// Completion summary.
    pub completion_summary: Option<String>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for subtask records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = subtasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubtaskRow {
    /// Subtask identifier.
    pub id: uuid::Uuid,
    /// Parent task identifier.
    pub parent_task_id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Lifecycle status.
    pub status: String,
    /// Progress percentage.
    pub progress_percentage: i16,
    /// Assignees JSON array.
    pub assignees: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and update model for subtask records.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = subtasks)]
pub struct NewSubtaskRow {
    /// Subtask identifier.
    pub id: uuid::Uuid,
    /// Parent task identifier.
    pub parent_task_id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Lifecycle status.
    pub status: String,
    /// Progress percentage.
    pub progress_percentage: i16,
    /// Assignees JSON array.
    pub assignees: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task events.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = task_events)]
pub struct NewTaskEventRow {
    /// Event identifier.
    pub event_id: uuid::Uuid,
    /// Task the event concerns.
    pub task_id: uuid::Uuid,
    /// Event kind.
    pub kind: String,
    /// Structured metadata.
    pub metadata: Value,
    /// Occurrence timestamp.
    pub occurred_at: DateTime<Utc>,
}
