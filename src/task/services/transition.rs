//! Status transition validation.
//!
//! Wraps the adjacency table in [`TaskStatus`] with the rules that need
//! collaborators: completing a task requires every subtask to be done.

use crate::task::{
    domain::{Task, TaskStatus},
    ports::SubtaskRepository,
};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Verdict of a transition check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionCheck {
    allowed: bool,
    reason: Option<String>,
}

impl TransitionCheck {
    /// An accepted transition.
    #[must_use]
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// A rejected transition with its explanation.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Returns `true` when the transition may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Returns the rejection reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Result of applying a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    /// Whether the task status changed.
    pub success: bool,
    /// Human-readable explanation.
    pub message: String,
}

impl TransitionOutcome {
    fn succeeded(message: String) -> Self {
        Self {
            success: true,
            message,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// UI hint describing one outgoing transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionHint {
    /// Target status.
    pub status: TaskStatus,
    /// What moving to the status means.
    pub description: &'static str,
    /// Conditions that must hold before the move.
    pub prerequisites: Vec<String>,
    /// Whether the prerequisites currently hold.
    pub available: bool,
}

/// Validates and applies task status transitions.
#[derive(Clone)]
pub struct StatusTransitionService<S, C>
where
    S: SubtaskRepository,
    C: Clock + Send + Sync,
{
    subtasks: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> StatusTransitionService<S, C>
where
    S: SubtaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new transition service.
    #[must_use]
    pub const fn new(subtasks: Arc<S>, clock: Arc<C>) -> Self {
        Self { subtasks, clock }
    }

    /// Checks whether `task` may move to `target`.
    ///
    /// Never fails: a subtask lookup error becomes a rejection whose reason
    /// carries the error text.
    pub async fn can_transition(&self, task: &Task, target: TaskStatus) -> TransitionCheck {
        let current = task.status();

        if target == TaskStatus::Review && current != TaskStatus::InProgress {
            return TransitionCheck::rejected(format!(
                "Task must be in_progress to move to review (current status: {current})"
            ));
        }

        if current.is_terminal() {
            return TransitionCheck::rejected(format!(
                "Task is in terminal status {current} and cannot transition to {target}"
            ));
        }

        if !current.can_transition_to(target) {
            return TransitionCheck::rejected(format!(
                "Cannot transition from {current} to {target}"
            ));
        }

        if target == TaskStatus::Done {
            return self.check_subtasks_complete(task).await;
        }

        TransitionCheck::allowed()
    }

    /// Validates and applies a transition to `task`.
    ///
    /// The task is only mutated when validation passes; the caller persists
    /// it.
    pub async fn transition_to(&self, task: &mut Task, target: TaskStatus) -> TransitionOutcome {
        let from = task.status();
        let check = self.can_transition(task, target).await;
        if !check.is_allowed() {
            let reason = check.reason.unwrap_or_default();
            debug!(task_id = %task.id(), %from, to = %target, %reason, "transition rejected");
            return TransitionOutcome::failed(reason);
        }

        match task.transition_to(target, &*self.clock) {
            Ok(()) => TransitionOutcome::succeeded(format!(
                "Task transitioned from {from} to {target}"
            )),
            Err(err) => TransitionOutcome::failed(err.to_string()),
        }
    }

    /// Describes every outgoing edge of the task's current status.
    pub async fn allowed_transitions(&self, task: &Task) -> Vec<TransitionHint> {
        let mut hints = Vec::new();
        for target in task.status().allowed_transitions() {
            let available = self.can_transition(task, *target).await.is_allowed();
            hints.push(TransitionHint {
                status: *target,
                description: describe(*target),
                prerequisites: prerequisites(*target),
                available,
            });
        }
        hints
    }

    /// Returns the canonical next status on the happy path.
    #[must_use]
    pub const fn suggest_next_status(&self, task: &Task) -> Option<TaskStatus> {
        task.status().next_on_happy_path()
    }

    async fn check_subtasks_complete(&self, task: &Task) -> TransitionCheck {
        match self.subtasks.find_by_parent_task_id(task.id()).await {
            Ok(subtasks) => {
                let total = subtasks.len();
                let incomplete = subtasks
                    .iter()
                    .filter(|subtask| !subtask.is_completed())
                    .count();
                if incomplete > 0 {
                    TransitionCheck::rejected(format!(
                        "Cannot complete task: {incomplete} of {total} subtasks incomplete"
                    ))
                } else {
                    TransitionCheck::allowed()
                }
            }
            Err(err) => TransitionCheck::rejected(format!("Transition validation failed: {err}")),
        }
    }
}

const fn describe(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "Return the task to the backlog",
        TaskStatus::InProgress => "Start working on the task",
        TaskStatus::Review => "Submit the work for review",
        TaskStatus::Testing => "Verify the work through testing",
        TaskStatus::Blocked => "Mark the task as blocked",
        TaskStatus::Cancelled => "Abandon the task",
        TaskStatus::Done => "Mark the task as complete",
    }
}

fn prerequisites(status: TaskStatus) -> Vec<String> {
    match status {
        TaskStatus::Review => vec!["Task must be in progress".to_owned()],
        TaskStatus::Done => vec!["All subtasks must be completed".to_owned()],
        TaskStatus::Todo
        | TaskStatus::InProgress
        | TaskStatus::Testing
        | TaskStatus::Blocked
        | TaskStatus::Cancelled => Vec::new(),
    }
}
