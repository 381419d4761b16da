//! Task aggregate root.

use super::{BranchId, ProjectId, TaskDomainError, TaskId, TaskLimits, TaskPriority, TaskStatus};
use crate::context::domain::ContextId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    title: String,
    description: String,
    priority: TaskPriority,
    assignees: Vec<String>,
    labels: Vec<String>,
    dependencies: Vec<TaskId>,
    estimated_effort: Option<String>,
    due_date: Option<DateTime<Utc>>,
    project_id: Option<ProjectId>,
    branch_id: Option<BranchId>,
}

impl TaskDraft {
    /// Creates a draft with the required title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the assignees.
    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = String>) -> Self {
        self.assignees = assignees.into_iter().collect();
        self
    }

    /// Sets the labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// Sets the effort estimate.
    #[must_use]
    pub fn with_estimated_effort(mut self, effort: impl Into<String>) -> Self {
        self.estimated_effort = Some(effort.into());
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the owning project.
    #[must_use]
    pub const fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the owning branch.
    #[must_use]
    pub const fn with_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    /// Returns the dependencies declared by the draft.
    #[must_use]
    pub fn dependencies(&self) -> &[TaskId] {
        &self.dependencies
    }
}

/// Partial edit of the descriptive task fields.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskChanges {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement priority.
    pub priority: Option<TaskPriority>,
    /// Replacement label set.
    pub labels: Option<Vec<String>>,
    /// Replacement effort estimate.
    pub estimated_effort: Option<String>,
    /// Replacement due date.
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskChanges {
    /// Returns `true` when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.labels.is_none()
            && self.estimated_effort.is_none()
            && self.due_date.is_none()
    }
}

/// Task aggregate root.
///
/// Dependencies and subtasks are held by identifier only; the context link
/// is a weak reference to the task-level context record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: String,
    status: TaskStatus,
    priority: TaskPriority,
    assignees: Vec<String>,
    labels: Vec<String>,
    dependencies: Vec<TaskId>,
    estimated_effort: Option<String>,
    due_date: Option<DateTime<Utc>>,
    project_id: Option<ProjectId>,
    branch_id: Option<BranchId>,
    context_id: Option<ContextId>,
    completion_summary: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: String,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted priority.
    pub priority: TaskPriority,
    /// Persisted assignees in assignment order.
    pub assignees: Vec<String>,
    /// Persisted labels.
    pub labels: Vec<String>,
    /// Persisted dependency identifiers.
    pub dependencies: Vec<TaskId>,
    /// Persisted effort estimate.
    pub estimated_effort: Option<String>,
    /// Persisted due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Persisted project link.
    pub project_id: Option<ProjectId>,
    /// Persisted branch link.
    pub branch_id: Option<BranchId>,
    /// Persisted context link.
    pub context_id: Option<ContextId>,
    /// Persisted completion summary.
    pub completion_summary: Option<String>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a validated task in the `todo` state.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskDomainError`] when any field violates `limits` or the
    /// draft lists the new task among its own dependencies.
    pub fn create(
        draft: TaskDraft,
        limits: &TaskLimits,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let id = TaskId::new();
        let title = validate_title(&draft.title, limits)?;
        validate_description(&draft.description, limits)?;
        let assignees = normalize_assignees(draft.assignees, limits)?;
        let labels = normalize_labels(draft.labels, limits)?;
        let dependencies = dedupe(draft.dependencies);
        if dependencies.len() > limits.max_dependencies {
            return Err(TaskDomainError::TooManyDependencies {
                max: limits.max_dependencies,
            });
        }
        if dependencies.contains(&id) {
            return Err(TaskDomainError::SelfDependency(id));
        }

        let timestamp = clock.utc();
        Ok(Self {
            id,
            title,
            description: draft.description,
            status: TaskStatus::Todo,
            priority: draft.priority,
            assignees,
            labels,
            dependencies,
            estimated_effort: draft.estimated_effort,
            due_date: draft.due_date,
            project_id: draft.project_id,
            branch_id: draft.branch_id,
            context_id: None,
            completion_summary: None,
            completed_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            assignees: data.assignees,
            labels: data.labels,
            dependencies: data.dependencies,
            estimated_effort: data.estimated_effort,
            due_date: data.due_date,
            project_id: data.project_id,
            branch_id: data.branch_id,
            context_id: data.context_id,
            completion_summary: data.completion_summary,
            completed_at: data.completed_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the assignees in assignment order.
    #[must_use]
    pub fn assignees(&self) -> &[String] {
        &self.assignees
    }

    /// Returns the labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the identifiers of tasks this task waits on.
    #[must_use]
    pub fn dependencies(&self) -> &[TaskId] {
        &self.dependencies
    }

    /// Returns `true` when `other` is one of this task's dependencies.
    #[must_use]
    pub fn depends_on(&self, other: TaskId) -> bool {
        self.dependencies.contains(&other)
    }

    /// Returns the effort estimate.
    #[must_use]
    pub fn estimated_effort(&self) -> Option<&str> {
        self.estimated_effort.as_deref()
    }

    /// Returns the due date.
    #[must_use]
    pub const fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Returns the owning branch.
    #[must_use]
    pub const fn branch_id(&self) -> Option<BranchId> {
        self.branch_id
    }

    /// Returns the linked task context.
    #[must_use]
    pub const fn context_id(&self) -> Option<ContextId> {
        self.context_id
    }

    /// Returns the completion summary recorded when the task was completed.
    #[must_use]
    pub fn completion_summary(&self) -> Option<&str> {
        self.completion_summary.as_deref()
    }

    /// Returns the completion timestamp.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
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

    /// Moves the task to `target` when the adjacency table allows it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the current
    /// status has no edge to `target`. The task is left unchanged.
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.update_status(target, clock);
        Ok(())
    }

    /// Sets the status without consulting the adjacency table.
    ///
    /// Used by [`Task::transition_to`] and [`Task::complete`] once the
    /// change has been validated.
    pub(crate) fn update_status(&mut self, status: TaskStatus, clock: &impl Clock) {
        self.status = status;
        if status.is_done() && self.completed_at.is_none() {
            self.completed_at = Some(clock.utc());
        }
        self.touch(clock);
    }

    /// Marks the task done and records the completion summary.
    pub fn complete(&mut self, summary: impl Into<String>, clock: &impl Clock) {
        self.completion_summary = Some(summary.into());
        self.update_status(TaskStatus::Done, clock);
    }

    /// Applies a partial edit of the descriptive fields.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskDomainError`] when a replacement value violates
    /// `limits`; no field is changed in that case.
    pub fn apply_changes(
        &mut self,
        changes: TaskChanges,
        limits: &TaskLimits,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let title = changes
            .title
            .as_deref()
            .map(|value| validate_title(value, limits))
            .transpose()?;
        if let Some(description) = changes.description.as_deref() {
            validate_description(description, limits)?;
        }
        let labels = changes
            .labels
            .map(|values| normalize_labels(values, limits))
            .transpose()?;

        if let Some(value) = title {
            self.title = value;
        }
        if let Some(value) = changes.description {
            self.description = value;
        }
        if let Some(value) = changes.priority {
            self.priority = value;
        }
        if let Some(value) = labels {
            self.labels = value;
        }
        if let Some(value) = changes.estimated_effort {
            self.estimated_effort = Some(value);
        }
        if let Some(value) = changes.due_date {
            self.due_date = Some(value);
        }
        self.touch(clock);
        Ok(())
    }

    /// Appends an agent to the assignee list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyAssignee`],
    /// [`TaskDomainError::DuplicateAssignee`] or
    /// [`TaskDomainError::TooManyAssignees`].
    pub fn assign(
        &mut self,
        agent_id: &str,
        limits: &TaskLimits,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let trimmed = agent_id.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyAssignee);
        }
        if self.assignees.iter().any(|existing| existing == trimmed) {
            return Err(TaskDomainError::DuplicateAssignee(trimmed.to_owned()));
        }
        if self.assignees.len() >= limits.max_assignees {
            return Err(TaskDomainError::TooManyAssignees {
                max: limits.max_assignees,
            });
        }
        self.assignees.push(trimmed.to_owned());
        self.touch(clock);
        Ok(())
    }

    /// Removes an agent from the assignee list.
    ///
    /// Returns `true` when the agent was assigned.
    pub fn unassign(&mut self, agent_id: &str, clock: &impl Clock) -> bool {
        let before = self.assignees.len();
        self.assignees.retain(|existing| existing != agent_id.trim());
        let removed = self.assignees.len() != before;
        if removed {
            self.touch(clock);
        }
        removed
    }

    /// Records a dependency on another task.
    ///
    /// Existence and cycle checks need the full task listing and are the
    /// service layer's job.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::SelfDependency`],
    /// [`TaskDomainError::DuplicateDependency`] or
    /// [`TaskDomainError::TooManyDependencies`].
    pub fn add_dependency(
        &mut self,
        dependency_id: TaskId,
        limits: &TaskLimits,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if dependency_id == self.id {
            return Err(TaskDomainError::SelfDependency(self.id));
        }
        if self.depends_on(dependency_id) {
            return Err(TaskDomainError::DuplicateDependency {
                task_id: self.id,
                dependency_id,
            });
        }
        if self.dependencies.len() >= limits.max_dependencies {
            return Err(TaskDomainError::TooManyDependencies {
                max: limits.max_dependencies,
            });
        }
        self.dependencies.push(dependency_id);
        self.touch(clock);
        Ok(())
    }

    /// Removes a dependency. Returns `true` when it was present.
    pub fn remove_dependency(&mut self, dependency_id: TaskId, clock: &impl Clock) -> bool {
        let before = self.dependencies.len();
        self.dependencies.retain(|id| *id != dependency_id);
        let removed = self.dependencies.len() != before;
        if removed {
            self.touch(clock);
        }
        removed
    }

    /// Links the task to its task-level context.
    pub fn link_context(&mut self, context_id: ContextId, clock: &impl Clock) {
        self.context_id = Some(context_id);
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

fn validate_title(raw: &str, limits: &TaskLimits) -> Result<String, TaskDomainError> {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if length < limits.min_title_length || length > limits.max_title_length {
        return Err(TaskDomainError::InvalidTitleLength {
            actual: length,
            min: limits.min_title_length,
            max: limits.max_title_length,
        });
    }
    Ok(trimmed.to_owned())
}

fn validate_description(description: &str, limits: &TaskLimits) -> Result<(), TaskDomainError> {
    let length = description.chars().count();
    if length > limits.max_description_length {
        return Err(TaskDomainError::DescriptionTooLong {
            actual: length,
            max: limits.max_description_length,
        });
    }
    Ok(())
}

fn normalize_assignees(
    assignees: Vec<String>,
    limits: &TaskLimits,
) -> Result<Vec<String>, TaskDomainError> {
    let mut normalized: Vec<String> = Vec::with_capacity(assignees.len());
    for assignee in assignees {
        let trimmed = assignee.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyAssignee);
        }
        if !normalized.iter().any(|existing| existing == trimmed) {
            normalized.push(trimmed.to_owned());
        }
    }
    if normalized.len() > limits.max_assignees {
        return Err(TaskDomainError::TooManyAssignees {
            max: limits.max_assignees,
        });
    }
    Ok(normalized)
}

/// Labels behave as a set: blanks are dropped and duplicates collapse while
/// keeping first-seen order.
fn normalize_labels(
    labels: Vec<String>,
    limits: &TaskLimits,
) -> Result<Vec<String>, TaskDomainError> {
    let cleaned = labels
        .into_iter()
        .map(|label| label.trim().to_owned())
        .filter(|label| !label.is_empty());
    let normalized = dedupe(cleaned);
    if normalized.len() > limits.max_labels {
        return Err(TaskDomainError::TooManyLabels {
            max: limits.max_labels,
        });
    }
    Ok(normalized)
}

fn dedupe<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut unique = Vec::new();
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}
