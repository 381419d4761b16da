//! Two-phase task completion.
//!
//! [`TaskCompletionService::validate_completion`] collects every blocker
//! without side effects. [`TaskCompletionService::complete_task`] then
//! applies the completion, with `force` as an explicit parameter that
//! bypasses context blockers only. Subtask and status blockers always hold.

use super::dependency::{DependencyResolution, DependencyResolutionService};
use crate::context::{
    domain::{ContextId, ContextLevel},
    ports::ContextRepository,
    services::ContextHierarchyService,
};
use crate::task::{
    domain::{Task, TaskEvent, TaskEventKind, TaskId, TaskStatus},
    ports::{SubtaskRepository, TaskEventSink, TaskRepository},
};
use chrono::TimeDelta;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Preconditions enforced before a task may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionPolicy {
    /// Whether a linked, existing task context is required.
    pub require_context: bool,
    /// Maximum age of the task context in seconds; `None` disables the
    /// freshness check.
    pub max_context_age_secs: Option<u64>,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            require_context: true,
            max_context_age_secs: None,
        }
    }
}

/// Reason a task cannot complete yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionBlocker {
    /// The task has no linked context.
    MissingContext,
    /// The linked context does not exist.
    ContextNotFound {
        /// Linked context identifier.
        context_id: ContextId,
    },
    /// The linked context has not been updated recently enough.
    StaleContext {
        /// Linked context identifier.
        context_id: ContextId,
        /// Seconds since the last update.
        age_secs: i64,
        /// Configured limit.
        max_age_secs: u64,
    },
    /// The context could not be loaded.
    ContextLookupFailed {
        /// Error text.
        error: String,
    },
    /// Some subtasks are unfinished.
    IncompleteSubtasks {
        /// Unfinished subtasks.
        incomplete: usize,
        /// All subtasks.
        total: usize,
    },
    /// The task is blocked or cancelled.
    InvalidStatus {
        /// Current status.
        status: TaskStatus,
    },
    /// The subtasks could not be loaded.
    SubtaskLookupFailed {
        /// Error text.
        error: String,
    },
}

impl CompletionBlocker {
    /// Returns `true` for blockers that `force` may bypass.
    #[must_use]
    pub const fn is_context_blocker(&self) -> bool {
        matches!(
            self,
            Self::MissingContext
                | Self::ContextNotFound { .. }
                | Self::StaleContext { .. }
                | Self::ContextLookupFailed { .. }
        )
    }
}

impl fmt::Display for CompletionBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingContext => f.write_str(
                "Task completion requires a task context; create or link one before completing",
            ),
            Self::ContextNotFound { context_id } => {
                write!(f, "Task context {context_id} not found")
            }
            Self::StaleContext {
                context_id,
                age_secs,
                max_age_secs,
            } => write!(
                f,
                "Task context {context_id} last updated {age_secs}s ago (limit {max_age_secs}s)"
            ),
            Self::ContextLookupFailed { error } => write!(f, "Context lookup failed: {error}"),
            Self::IncompleteSubtasks { incomplete, total } => {
                write!(f, "{incomplete} of {total} subtasks incomplete")
            }
            Self::InvalidStatus { status } => write!(f, "Task status is {status}"),
            Self::SubtaskLookupFailed { error } => write!(f, "Subtask lookup failed: {error}"),
        }
    }
}

/// Result of the validation phase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompletionCheck {
    /// Every blocker found.
    pub blockers: Vec<CompletionBlocker>,
}

impl CompletionCheck {
    /// Returns `true` when nothing blocks completion.
    #[must_use]
    pub const fn can_complete(&self) -> bool {
        self.blockers.is_empty()
    }

    /// Returns `true` when `force` would clear every blocker.
    #[must_use]
    pub fn bypassable(&self) -> bool {
        self.blockers.iter().all(CompletionBlocker::is_context_blocker)
    }

    /// Renders every blocker as a message.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.blockers.iter().map(ToString::to_string).collect()
    }
}

/// Request to complete a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteTaskRequest {
    /// Task to complete.
    pub task_id: TaskId,
    /// Summary of the work done; must not be blank.
    pub completion_summary: String,
    /// Optional notes about how the work was tested.
    pub testing_notes: Option<String>,
    /// Bypass context blockers.
    pub force: bool,
}

impl CompleteTaskRequest {
    /// Creates an unforced request.
    #[must_use]
    pub fn new(task_id: TaskId, completion_summary: impl Into<String>) -> Self {
        Self {
            task_id,
            completion_summary: completion_summary.into(),
            testing_notes: None,
            force: false,
        }
    }

    /// Adds testing notes.
    #[must_use]
    pub fn with_testing_notes(mut self, notes: impl Into<String>) -> Self {
        self.testing_notes = Some(notes.into());
        self
    }

    /// Requests that context blockers be bypassed.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Structured answer of [`TaskCompletionService::complete_task`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOutcome {
    /// Whether the task is done after the call.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Task state after the call, when it could be loaded.
    pub task: Option<Task>,
    /// Whether context blockers were bypassed.
    pub forced: bool,
    /// Messages of the bypassed blockers.
    pub bypassed: Vec<String>,
    /// Messages of the blockers that stopped completion.
    pub blockers: Vec<String>,
    /// Whether the completion summary reached the task context.
    pub context_synced: bool,
    /// Dependents unblocked by this completion.
    pub dependency_resolution: Option<DependencyResolution>,
}

impl CompletionOutcome {
    fn failure(message: impl Into<String>, task: Option<Task>) -> Self {
        Self {
            success: false,
            message: message.into(),
            task,
            forced: false,
            bypassed: Vec::new(),
            blockers: Vec::new(),
            context_synced: false,
            dependency_resolution: None,
        }
    }

    fn blocked(task: Task, check: &CompletionCheck) -> Self {
        let blockers = check.messages();
        Self {
            blockers: blockers.clone(),
            ..Self::failure(
                format!("Task cannot be completed: {}", blockers.join("; ")),
                Some(task),
            )
        }
    }
}

/// Validates and applies task completion.
#[derive(Clone)]
pub struct TaskCompletionService<R, S, X, E, C>
where
    R: TaskRepository,
    S: SubtaskRepository,
    X: ContextRepository,
    E: TaskEventSink,
    C: Clock + Send + Sync,
{
    tasks: Arc<R>,
    subtasks: Arc<S>,
    contexts: Arc<X>,
    events: Arc<E>,
    clock: Arc<C>,
    dependencies: DependencyResolutionService<R, C>,
    hierarchy: ContextHierarchyService<X, C>,
    policy: CompletionPolicy,
}

impl<R, S, X, E, C> TaskCompletionService<R, S, X, E, C>
where
    R: TaskRepository,
    S: SubtaskRepository,
    X: ContextRepository,
    E: TaskEventSink,
    C: Clock + Send + Sync,
{
    /// Creates a completion service with the default policy.
    #[must_use]
    pub fn new(
        tasks: Arc<R>,
        subtasks: Arc<S>,
        contexts: Arc<X>,
        events: Arc<E>,
        clock: Arc<C>,
    ) -> Self {
        let dependencies = DependencyResolutionService::new(Arc::clone(&tasks), Arc::clone(&clock));
        let hierarchy = ContextHierarchyService::new(Arc::clone(&contexts), Arc::clone(&clock));
        Self {
            tasks,
            subtasks,
            contexts,
            events,
            clock,
            dependencies,
            hierarchy,
            policy: CompletionPolicy::default(),
        }
    }

    /// Replaces the completion policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Collects every reason `task` cannot complete. Has no side effects.
    pub async fn validate_completion(&self, task: &Task) -> CompletionCheck {
        let mut check = CompletionCheck::default();

        if matches!(task.status(), TaskStatus::Blocked | TaskStatus::Cancelled) {
            check.blockers.push(CompletionBlocker::InvalidStatus {
                status: task.status(),
            });
        }

        if self.policy.require_context
            && let Some(blocker) = self.context_blocker(task).await
        {
            check.blockers.push(blocker);
        }

        match self.subtasks.find_by_parent_task_id(task.id()).await {
            Ok(subtasks) => {
                let total = subtasks.len();
                let incomplete = subtasks
                    .iter()
                    .filter(|subtask| !subtask.is_completed())
                    .count();
                if incomplete > 0 {
                    check
                        .blockers
                        .push(CompletionBlocker::IncompleteSubtasks { incomplete, total });
                }
            }
            Err(err) => check.blockers.push(CompletionBlocker::SubtaskLookupFailed {
                error: err.to_string(),
            }),
        }

        check
    }

    /// Completes a task.
    ///
    /// Never fails: every problem is reported through the returned
    /// [`CompletionOutcome`]. Completing a task that is already done
    /// succeeds without changes. A failed context sync is reported as
    /// `context_synced = false` and does not undo the completion.
    pub async fn complete_task(&self, request: CompleteTaskRequest) -> CompletionOutcome {
        let task_id = request.task_id;
        let summary = request.completion_summary.trim().to_owned();
        if summary.is_empty() {
            return CompletionOutcome::failure("Completion summary is required", None);
        }

        let mut task = match self.tasks.find_by_id(task_id).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                return CompletionOutcome::failure(format!("Task {task_id} not found"), None);
            }
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "task lookup failed during completion");
                return CompletionOutcome::failure(format!("Failed to load task: {err}"), None);
            }
        };

        if task.status().is_done() {
            return CompletionOutcome {
                success: true,
                ..CompletionOutcome::failure("Task is already completed", Some(task))
            };
        }

        let check = self.validate_completion(&task).await;
        if !check.can_complete() && !(request.force && check.bypassable()) {
            return CompletionOutcome::blocked(task, &check);
        }
        let bypassed = check.messages();
        let forced = !bypassed.is_empty();
        if forced {
            warn!(task_id = %task_id, bypassed = ?bypassed, "task completion forced");
        }

        task.complete(summary.clone(), &*self.clock);
        if let Err(err) = self.tasks.update(&task).await {
            warn!(task_id = %task_id, error = %err, "completed task could not be persisted");
            return CompletionOutcome::failure(format!("Failed to save task: {err}"), None);
        }
        info!(task_id = %task_id, forced, "task completed");

        self.publish(completion_event(&task, &request, forced, &bypassed, &*self.clock))
            .await;
        let context_synced = self.sync_context(&task, &request).await;
        let resolution = self.dependencies.handle_dependency_completion(&task).await;
        for update in &resolution.updates {
            self.publish(
                TaskEvent::new(update.task_id, TaskEventKind::TaskUnblocked, &*self.clock)
                    .with_metadata("unblocked_by", task_id.to_string()),
            )
            .await;
        }

        CompletionOutcome {
            success: true,
            message: if forced {
                "Task completed with context checks bypassed".to_owned()
            } else {
                "Task completed successfully".to_owned()
            },
            task: Some(task),
            forced,
            bypassed,
            blockers: Vec::new(),
            context_synced,
            dependency_resolution: Some(resolution),
        }
    }

    async fn context_blocker(&self, task: &Task) -> Option<CompletionBlocker> {
        let Some(context_id) = task.context_id() else {
            return Some(CompletionBlocker::MissingContext);
        };
        match self.contexts.find(ContextLevel::Task, context_id).await {
            Ok(None) => Some(CompletionBlocker::ContextNotFound { context_id }),
            Ok(Some(context)) => {
                let max_age_secs = self.policy.max_context_age_secs?;
                let limit = i64::try_from(max_age_secs)
                    .ok()
                    .and_then(TimeDelta::try_seconds)
                    .unwrap_or(TimeDelta::MAX);
                let now = self.clock.utc();
                if context.is_fresh(limit, now) {
                    None
                } else {
                    Some(CompletionBlocker::StaleContext {
                        context_id,
                        age_secs: now.signed_duration_since(context.updated_at()).num_seconds(),
                        max_age_secs,
                    })
                }
            }
            Err(err) => Some(CompletionBlocker::ContextLookupFailed {
                error: err.to_string(),
            }),
        }
    }

    async fn sync_context(&self, task: &Task, request: &CompleteTaskRequest) -> bool {
        let Some(context_id) = task.context_id() else {
            return false;
        };
        let mut completion = Map::new();
        completion.insert(
            "summary".to_owned(),
            Value::String(request.completion_summary.trim().to_owned()),
        );
        if let Some(notes) = &request.testing_notes {
            completion.insert("testing_notes".to_owned(), Value::String(notes.clone()));
        }
        completion.insert(
            "completed_at".to_owned(),
            json!(task.completed_at().map(|at| at.to_rfc3339())),
        );
        let mut changes = Map::new();
        changes.insert("completion".to_owned(), Value::Object(completion));

        match self
            .hierarchy
            .update_context(ContextLevel::Task, context_id, &changes, false)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    task_id = %task.id(),
                    %context_id,
                    error = %err,
                    "task context update failed; completion not synced"
                );
                false
            }
        }
    }

    async fn publish(&self, event: TaskEvent) {
        if let Err(err) = self.events.publish(&event).await {
            warn!(task_id = %event.task_id, kind = %event.kind, error = %err, "task event dropped");
        }
    }
}

fn completion_event(
    task: &Task,
    request: &CompleteTaskRequest,
    forced: bool,
    bypassed: &[String],
    clock: &impl Clock,
) -> TaskEvent {
    let summary = request.completion_summary.trim();
    let base = if forced {
        TaskEvent::new(task.id(), TaskEventKind::TaskUpdated, clock)
            .with_metadata("completion_summary", summary)
            .with_metadata("forced", true)
            .with_metadata("bypassed", bypassed.to_vec())
    } else {
        TaskEvent::new(task.id(), TaskEventKind::TaskCompleted, clock)
            .with_metadata("completion_summary", summary)
    };
    match &request.testing_notes {
        Some(notes) => base.with_metadata("testing_notes", notes.as_str()),
        None => base,
    }
}
