//! Service layer for task and subtask CRUD, assignment and dependencies.

use super::dependency::detect_cycle;
use super::progress::SubtaskSummary;
use super::transition::StatusTransitionService;
use crate::context::domain::ContextId;
use crate::task::{
    domain::{
        ParseTaskStatusError, Subtask, SubtaskId, Task, TaskChanges, TaskDomainError, TaskDraft,
        TaskEvent, TaskEventKind, TaskId, TaskLimits, TaskStatus,
    },
    ports::{SubtaskRepository, TaskEventSink, TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// A status string could not be parsed.
    #[error(transparent)]
    InvalidStatus(#[from] ParseTaskStatusError),
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The subtask does not exist.
    #[error("subtask not found: {0}")]
    SubtaskNotFound(SubtaskId),
    /// A referenced dependency does not exist.
    #[error("dependency task not found: {0}")]
    DependencyNotFound(TaskId),
    /// Adding the dependency would close a cycle.
    #[error("dependency cycle detected: {}", format_cycle(.0))]
    DependencyCycle(Vec<TaskId>),
    /// The transition validator refused the status change.
    #[error("transition rejected for task {task_id}: {reason}")]
    TransitionRejected {
        /// Task whose transition was refused.
        task_id: TaskId,
        /// Validator explanation.
        reason: String,
    },
}

fn format_cycle(path: &[TaskId]) -> String {
    let mut rendered: Vec<String> = path.iter().map(ToString::to_string).collect();
    if let Some(first) = path.first() {
        rendered.push(first.to_string());
    }
    rendered.join(" -> ")
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, S, E, C>
where
    R: TaskRepository,
    S: SubtaskRepository,
    E: TaskEventSink,
    C: Clock + Send + Sync,
{
    tasks: Arc<R>,
    subtasks: Arc<S>,
    events: Arc<E>,
    clock: Arc<C>,
    transitions: StatusTransitionService<S, C>,
    limits: TaskLimits,
}

impl<R, S, E, C> TaskLifecycleService<R, S, E, C>
where
    R: TaskRepository,
    S: SubtaskRepository,
    E: TaskEventSink,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service with the default limits.
    #[must_use]
    pub fn new(tasks: Arc<R>, subtasks: Arc<S>, events: Arc<E>, clock: Arc<C>) -> Self {
        let transitions = StatusTransitionService::new(Arc::clone(&subtasks), Arc::clone(&clock));
        Self {
            tasks,
            subtasks,
            events,
            clock,
            transitions,
            limits: TaskLimits::default(),
        }
    }

    /// Replaces the validation limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: TaskLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Creates and persists a task, then publishes `TaskCreated`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] when the draft violates the
    /// limits, [`TaskLifecycleError::DependencyNotFound`] for an unknown
    /// dependency, and [`TaskLifecycleError::Repository`] when storage fails.
    pub async fn create_task(&self, draft: TaskDraft) -> TaskLifecycleResult<Task> {
        for dependency_id in draft.dependencies() {
            if self.tasks.find_by_id(*dependency_id).await?.is_none() {
                return Err(TaskLifecycleError::DependencyNotFound(*dependency_id));
            }
        }
        let task = Task::create(draft, &self.limits, &*self.clock)?;
        self.tasks.store(&task).await?;
        info!(task_id = %task.id(), title = task.title(), "task created");
        self.publish(TaskEvent::new(task.id(), TaskEventKind::TaskCreated, &*self.clock))
            .await;
        Ok(task)
    }

    /// Retrieves a task.
    ///
    /// Returns `Ok(None)` when the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_task(&self, task_id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.tasks.find_by_id(task_id).await?)
    }

    /// Lists every task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when listing fails.
    pub async fn list_tasks(&self) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.tasks.find_all().await?)
    }

    /// Applies a partial edit and publishes `TaskUpdated`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task and
    /// [`TaskLifecycleError::Domain`] when a value violates the limits.
    pub async fn update_task(
        &self,
        task_id: TaskId,
        changes: TaskChanges,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load(task_id).await?;
        if changes.is_empty() {
            return Ok(task);
        }
        task.apply_changes(changes, &self.limits, &*self.clock)?;
        self.tasks.update(&task).await?;
        self.publish(TaskEvent::new(task_id, TaskEventKind::TaskUpdated, &*self.clock))
            .await;
        Ok(task)
    }

    /// Parses `status` and moves the task there through the transition
    /// validator.
    ///
    /// `done` is never reached here: completion runs through
    /// [`TaskCompletionService::complete_task`](super::TaskCompletionService::complete_task),
    /// which checks the task context, records the summary and unblocks
    /// dependents.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::InvalidStatus`] for an unknown status
    /// string and [`TaskLifecycleError::TransitionRejected`] when the
    /// validator refuses the change or the target is `done`.
    pub async fn transition_task(
        &self,
        task_id: TaskId,
        status: &str,
    ) -> TaskLifecycleResult<Task> {
        let target = TaskStatus::try_from(status)?;
        let mut task = self.load(task_id).await?;
        if target == TaskStatus::Done {
            return Err(TaskLifecycleError::TransitionRejected {
                task_id,
                reason: "tasks reach done only through complete_task".to_owned(),
            });
        }
        let from = task.status();
        let outcome = self.transitions.transition_to(&mut task, target).await;
        if !outcome.success {
            return Err(TaskLifecycleError::TransitionRejected {
                task_id,
                reason: outcome.message,
            });
        }
        self.tasks.update(&task).await?;
        info!(task_id = %task_id, %from, to = %target, "task status changed");
        let event = TaskEvent::new(task_id, TaskEventKind::TaskUpdated, &*self.clock)
            .with_metadata("from_status", from.as_str())
            .with_metadata("to_status", target.as_str());
        self.publish(event).await;
        Ok(task)
    }

    /// Adds an agent to the task's assignees.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] for a blank, duplicate or
    /// surplus assignee.
    pub async fn assign_agent(&self, task_id: TaskId, agent_id: &str) -> TaskLifecycleResult<Task> {
        let mut task = self.load(task_id).await?;
        task.assign(agent_id, &self.limits, &*self.clock)?;
        self.tasks.update(&task).await?;
        Ok(task)
    }

    /// Removes an agent from the task's assignees. Unknown agents are a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task.
    pub async fn unassign_agent(
        &self,
        task_id: TaskId,
        agent_id: &str,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load(task_id).await?;
        if task.unassign(agent_id, &*self.clock) {
            self.tasks.update(&task).await?;
        }
        Ok(task)
    }

    /// Records that `task_id` depends on `dependency_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::DependencyNotFound`] for an unknown
    /// dependency, [`TaskLifecycleError::Domain`] for self, duplicate or
    /// surplus dependencies, and [`TaskLifecycleError::DependencyCycle`]
    /// when the new edge would close a cycle.
    pub async fn add_dependency(
        &self,
        task_id: TaskId,
        dependency_id: TaskId,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load(task_id).await?;
        task.add_dependency(dependency_id, &self.limits, &*self.clock)?;
        if self.tasks.find_by_id(dependency_id).await?.is_none() {
            return Err(TaskLifecycleError::DependencyNotFound(dependency_id));
        }

        let mut graph = self.tasks.find_all().await?;
        graph.retain(|existing| existing.id() != task_id);
        graph.push(task.clone());
        if let Some(cycle) = detect_cycle(&graph) {
            return Err(TaskLifecycleError::DependencyCycle(cycle));
        }

        self.tasks.update(&task).await?;
        info!(task_id = %task_id, dependency_id = %dependency_id, "dependency added");
        Ok(task)
    }

    /// Removes a dependency. Returns `true` when it was present.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task.
    pub async fn remove_dependency(
        &self,
        task_id: TaskId,
        dependency_id: TaskId,
    ) -> TaskLifecycleResult<bool> {
        let mut task = self.load(task_id).await?;
        let removed = task.remove_dependency(dependency_id, &*self.clock);
        if removed {
            self.tasks.update(&task).await?;
        }
        Ok(removed)
    }

    /// Creates a subtask under an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown parent and
    /// [`TaskLifecycleError::Domain`] for a blank title.
    pub async fn add_subtask(&self, task_id: TaskId, title: &str) -> TaskLifecycleResult<Subtask> {
        self.load(task_id).await?;
        let subtask = Subtask::new(task_id, title, &*self.clock)?;
        self.subtasks.store(&subtask).await?;
        Ok(subtask)
    }

    /// Records subtask progress; 100 completes it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::SubtaskNotFound`] for an unknown
    /// subtask and [`TaskLifecycleError::Domain`] for invalid progress.
    pub async fn update_subtask_progress(
        &self,
        subtask_id: SubtaskId,
        percentage: u8,
    ) -> TaskLifecycleResult<Subtask> {
        let mut subtask = self.load_subtask(subtask_id).await?;
        subtask.update_progress(percentage, &*self.clock)?;
        self.subtasks.update(&subtask).await?;
        Ok(subtask)
    }

    /// Marks a subtask done.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::SubtaskNotFound`] for an unknown
    /// subtask.
    pub async fn complete_subtask(&self, subtask_id: SubtaskId) -> TaskLifecycleResult<Subtask> {
        let mut subtask = self.load_subtask(subtask_id).await?;
        subtask.complete(&*self.clock);
        self.subtasks.update(&subtask).await?;
        Ok(subtask)
    }

    /// Lists the subtasks of a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when listing fails.
    pub async fn list_subtasks(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<Subtask>> {
        Ok(self.subtasks.find_by_parent_task_id(task_id).await?)
    }

    /// Summarizes subtask completion for a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when listing fails.
    pub async fn get_subtask_summary(
        &self,
        task_id: TaskId,
    ) -> TaskLifecycleResult<SubtaskSummary> {
        let subtasks = self.list_subtasks(task_id).await?;
        Ok(SubtaskSummary::from_subtasks(&subtasks))
    }

    /// Links a task to its task-level context.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task.
    pub async fn link_context(
        &self,
        task_id: TaskId,
        context_id: ContextId,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load(task_id).await?;
        task.link_context(context_id, &*self.clock);
        self.tasks.update(&task).await?;
        Ok(task)
    }

    async fn load(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    async fn load_subtask(&self, subtask_id: SubtaskId) -> TaskLifecycleResult<Subtask> {
        self.subtasks
            .find_by_id(subtask_id)
            .await?
            .ok_or(TaskLifecycleError::SubtaskNotFound(subtask_id))
    }

    async fn publish(&self, event: TaskEvent) {
        if let Err(err) = self.events.publish(&event).await {
            warn!(task_id = %event.task_id, kind = %event.kind, error = %err, "task event dropped");
        }
    }
}
