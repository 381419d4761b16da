//! Error types for task domain validation and parsing.

use super::{SubtaskId, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating task aggregates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The title is outside the permitted length range.
    #[error("title must be between {min} and {max} characters, got {actual}")]
    InvalidTitleLength {
        /// Character count of the rejected title.
        actual: usize,
        /// Minimum permitted length.
        min: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// The description exceeds the permitted length.
    #[error("description must be at most {max} characters, got {actual}")]
    DescriptionTooLong {
        /// Character count of the rejected description.
        actual: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// Too many assignees.
    #[error("a task accepts at most {max} assignees")]
    TooManyAssignees {
        /// Maximum permitted assignees.
        max: usize,
    },

    /// An assignee identifier is blank.
    #[error("assignee identifier must not be empty")]
    EmptyAssignee,

    /// The agent is already assigned.
    #[error("agent '{0}' is already assigned")]
    DuplicateAssignee(String),

    /// Too many labels.
    #[error("a task accepts at most {max} labels")]
    TooManyLabels {
        /// Maximum permitted labels.
        max: usize,
    },

    /// Too many dependencies.
    #[error("a task accepts at most {max} dependencies")]
    TooManyDependencies {
        /// Maximum permitted dependencies.
        max: usize,
    },

    /// A task cannot depend on itself.
    #[error("task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    /// The dependency is already recorded.
    #[error("task {task_id} already depends on {dependency_id}")]
    DuplicateDependency {
        /// Dependent task.
        task_id: TaskId,
        /// Existing dependency.
        dependency_id: TaskId,
    },

    /// The adjacency table forbids the requested transition.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    InvalidStateTransition {
        /// Task being transitioned.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// A subtask title is blank.
    #[error("subtask title must not be empty")]
    EmptySubtaskTitle,

    /// A progress percentage is above 100.
    #[error("progress percentage {0} is outside 0..=100")]
    InvalidProgress(u8),

    /// The subtask is cancelled and cannot record progress.
    #[error("subtask {0} is cancelled")]
    SubtaskCancelled(SubtaskId),
}

/// Error returned while parsing task statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task priorities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParseTaskPriorityError(pub String);
