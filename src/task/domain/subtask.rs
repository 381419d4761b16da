//! Subtask entity owned by a parent task.

use super::{SubtaskId, TaskDomainError, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Unit of work nested under a parent task.
///
/// Completion is derived from the status: a subtask is complete exactly when
/// its status is `done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    id: SubtaskId,
    parent_task_id: TaskId,
    title: String,
    status: TaskStatus,
    progress_percentage: u8,
    assignees: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSubtaskData {
    /// Persisted subtask identifier.
    pub id: SubtaskId,
    /// Persisted parent task identifier.
    pub parent_task_id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted progress percentage.
    pub progress_percentage: u8,
    /// Persisted assignees.
    pub assignees: Vec<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    /// Creates a `todo` subtask under `parent_task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptySubtaskTitle`] when the title is blank.
    pub fn new(
        parent_task_id: TaskId,
        title: &str,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptySubtaskTitle);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: SubtaskId::new(),
            parent_task_id,
            title: trimmed.to_owned(),
            status: TaskStatus::Todo,
            progress_percentage: 0,
            assignees: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a subtask from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSubtaskData) -> Self {
        Self {
            id: data.id,
            parent_task_id: data.parent_task_id,
            title: data.title,
            status: data.status,
            progress_percentage: data.progress_percentage,
            assignees: data.assignees,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Adds assignees while building a subtask.
    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = String>) -> Self {
        self.assignees = assignees.into_iter().collect();
        self
    }

    /// Returns the subtask identifier.
    #[must_use]
    pub const fn id(&self) -> SubtaskId {
        self.id
    }

    /// Returns the parent task identifier.
    #[must_use]
    pub const fn parent_task_id(&self) -> TaskId {
        self.parent_task_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the recorded progress percentage.
    #[must_use]
    pub const fn progress_percentage(&self) -> u8 {
        self.progress_percentage
    }

    /// Returns the assignees.
    #[must_use]
    pub fn assignees(&self) -> &[String] {
        &self.assignees
    }

    /// Returns `true` when the subtask is done.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.status.is_done()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records progress.
    ///
    /// Reaching 100 marks the subtask done; any progress on a `todo` subtask
    /// moves it to `in_progress`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidProgress`] above 100 and
    /// [`TaskDomainError::SubtaskCancelled`] for cancelled subtasks.
    pub fn update_progress(
        &mut self,
        percentage: u8,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if percentage > 100 {
            return Err(TaskDomainError::InvalidProgress(percentage));
        }
        if self.status == TaskStatus::Cancelled {
            return Err(TaskDomainError::SubtaskCancelled(self.id));
        }
        self.progress_percentage = percentage;
        if percentage == 100 {
            self.status = TaskStatus::Done;
        } else if percentage > 0 && self.status == TaskStatus::Todo {
            self.status = TaskStatus::InProgress;
        }
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Marks the subtask done at 100 percent.
    pub fn complete(&mut self, clock: &impl Clock) {
        self.status = TaskStatus::Done;
        self.progress_percentage = 100;
        self.updated_at = clock.utc();
    }

    /// Sets the status directly, keeping the percentage consistent with it.
    pub fn set_status(&mut self, status: TaskStatus, clock: &impl Clock) {
        self.status = status;
        if status.is_done() {
            self.progress_percentage = 100;
        }
        self.updated_at = clock.utc();
    }
}
