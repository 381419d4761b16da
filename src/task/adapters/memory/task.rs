//! In-memory task and subtask repositories.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{Subtask, SubtaskId, Task, TaskId},
    ports::{SubtaskRepository, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    insertion_order: Vec<TaskId>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        state.insertion_order.push(task.id());
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let slot = state
            .tasks
            .get_mut(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?;
        *slot = task.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_all(&self) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .insertion_order
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect())
    }
}

/// Thread-safe in-memory subtask repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubtaskRepository {
    state: Arc<RwLock<InMemorySubtaskState>>,
}

#[derive(Debug, Default)]
struct InMemorySubtaskState {
    subtasks: HashMap<SubtaskId, Subtask>,
    parent_index: HashMap<TaskId, Vec<SubtaskId>>,
}

impl InMemorySubtaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubtaskRepository for InMemorySubtaskRepository {
    async fn store(&self, subtask: &Subtask) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.subtasks.contains_key(&subtask.id()) {
            return Err(TaskRepositoryError::DuplicateSubtask(subtask.id()));
        }
        state
            .parent_index
            .entry(subtask.parent_task_id())
            .or_default()
            .push(subtask.id());
        state.subtasks.insert(subtask.id(), subtask.clone());
        Ok(())
    }

    async fn update(&self, subtask: &Subtask) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let slot = state
            .subtasks
            .get_mut(&subtask.id())
            .ok_or(TaskRepositoryError::SubtaskNotFound(subtask.id()))?;
        *slot = subtask.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: SubtaskId) -> TaskRepositoryResult<Option<Subtask>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.subtasks.get(&id).cloned())
    }

    async fn find_by_parent_task_id(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<Subtask>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .parent_index
            .get(&task_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.subtasks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}
