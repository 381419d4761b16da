//! Task status state machine and priority levels.

use super::{ParseTaskPriorityError, ParseTaskStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
///
/// Legal transitions form a fixed adjacency table:
///
/// | from          | to                                          |
/// |---------------|---------------------------------------------|
/// | `todo`        | `in_progress`, `blocked`, `cancelled`       |
/// | `in_progress` | `review`, `testing`, `done`, `blocked`, `todo` |
/// | `review`      | `testing`, `done`                           |
/// | `testing`     | `done`                                      |
/// | `blocked`     | `todo`                                      |
/// | `done`        | (terminal)                                  |
/// | `cancelled`   | (terminal)                                  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Work has not started.
    Todo,
    /// Work is under way.
    InProgress,
    /// Work is awaiting review.
    Review,
    /// Work is being tested.
    Testing,
    /// Work cannot proceed until something else finishes.
    Blocked,
    /// Work was abandoned.
    Cancelled,
    /// Work is complete.
    Done,
}

impl TaskStatus {
    /// Every status, in happy-path order followed by the side states.
    pub const ALL: [Self; 7] = [
        Self::Todo,
        Self::InProgress,
        Self::Review,
        Self::Testing,
        Self::Done,
        Self::Blocked,
        Self::Cancelled,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Testing => "testing",
            Self::Blocked => "blocked",
            Self::Cancelled => "cancelled",
            Self::Done => "done",
        }
    }

    /// Returns the statuses reachable in one step from `self`.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Todo => &[Self::InProgress, Self::Blocked, Self::Cancelled],
            Self::InProgress => &[
                Self::Review,
                Self::Testing,
                Self::Done,
                Self::Blocked,
                Self::Todo,
            ],
            Self::Review => &[Self::Testing, Self::Done],
            Self::Testing => &[Self::Done],
            Self::Blocked => &[Self::Todo],
            Self::Done | Self::Cancelled => &[],
        }
    }

    /// Returns `true` when the adjacency table permits `self -> target`.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Returns `true` for states with no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// Returns `true` when the status counts as finished work.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns the canonical next status on the linear happy path.
    ///
    /// The path is `todo -> in_progress -> review -> testing -> done`, with
    /// `blocked` returning to `todo`. Terminal states have no successor.
    #[must_use]
    pub const fn next_on_happy_path(self) -> Option<Self> {
        match self {
            Self::Todo => Some(Self::InProgress),
            Self::Blocked => Some(Self::Todo),
            Self::InProgress => Some(Self::Review),
            Self::Review => Some(Self::Testing),
            Self::Testing => Some(Self::Done),
            Self::Done | Self::Cancelled => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "testing" => Ok(Self::Testing),
            "blocked" => Ok(Self::Blocked),
            "cancelled" => Ok(Self::Cancelled),
            "done" => Ok(Self::Done),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Normal scheduling.
    #[default]
    Medium,
    /// Should be picked up soon.
    High,
    /// Needs attention now.
    Urgent,
    /// Blocks other work.
    Critical,
}

impl TaskPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskPriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseTaskPriorityError(value.to_owned())),
        }
    }
}
