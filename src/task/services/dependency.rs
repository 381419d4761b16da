//! Dependency tracking: unblocking dependents and rejecting cycles.

use crate::task::{
    domain::{Task, TaskId, TaskStatus},
    ports::TaskRepository,
};
use mockable::Clock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// One status change applied while resolving dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyUpdate {
    /// Task whose status changed.
    pub task_id: TaskId,
    /// Status before the change.
    pub old_status: TaskStatus,
    /// Status after the change.
    pub new_status: TaskStatus,
    /// Why the change happened.
    pub reason: String,
}

/// Outcome of resolving dependents of a completed task.
///
/// Updates applied before a failure are kept and reported; `partial_failure`
/// then carries the error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyResolution {
    /// Task whose completion triggered the scan.
    pub completed_task_id: TaskId,
    /// Updates that were applied and persisted.
    pub updates: Vec<DependencyUpdate>,
    /// Error that stopped the scan early, if any.
    pub partial_failure: Option<String>,
}

impl DependencyResolution {
    /// Returns `true` when the scan stopped before finishing.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial_failure.is_some()
    }
}

/// Unblocks dependents when tasks complete.
#[derive(Clone)]
pub struct DependencyResolutionService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    tasks: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> DependencyResolutionService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new dependency resolution service.
    #[must_use]
    pub const fn new(tasks: Arc<R>, clock: Arc<C>) -> Self {
        Self { tasks, clock }
    }

    /// Moves blocked dependents of `completed_task` back to `todo` once all
    /// of their dependencies are done.
    ///
    /// A dependency missing from the listing keeps its dependent blocked.
    pub async fn handle_dependency_completion(
        &self,
        completed_task: &Task,
    ) -> DependencyResolution {
        let completed_id = completed_task.id();
        let mut resolution = DependencyResolution {
            completed_task_id: completed_id,
            updates: Vec::new(),
            partial_failure: None,
        };

        let all_tasks = match self.tasks.find_all().await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(
                    task_id = %completed_id,
                    error = %err,
                    "dependency scan could not list tasks"
                );
                resolution.partial_failure = Some(err.to_string());
                return resolution;
            }
        };

        let statuses: HashMap<TaskId, TaskStatus> = all_tasks
            .iter()
            .map(|task| (task.id(), task.status()))
            .chain(std::iter::once((completed_id, completed_task.status())))
            .collect();

        for mut dependent in all_tasks
            .into_iter()
            .filter(|task| task.depends_on(completed_id))
        {
            if dependent.status() != TaskStatus::Blocked {
                continue;
            }
            let all_done = dependent.dependencies().iter().all(|dependency_id| {
                statuses
                    .get(dependency_id)
                    .is_some_and(|status| status.is_done())
            });
            if !all_done {
                continue;
            }

            let old_status = dependent.status();
            if let Err(err) = dependent.transition_to(TaskStatus::Todo, &*self.clock) {
                resolution.partial_failure = Some(err.to_string());
                break;
            }
            if let Err(err) = self.tasks.update(&dependent).await {
                warn!(
                    task_id = %dependent.id(),
                    error = %err,
                    applied = resolution.updates.len(),
                    "dependency resolution stopped early"
                );
                resolution.partial_failure = Some(err.to_string());
                break;
            }

            info!(task_id = %dependent.id(), unblocked_by = %completed_id, "task unblocked");
            resolution.updates.push(DependencyUpdate {
                task_id: dependent.id(),
                old_status,
                new_status: dependent.status(),
                reason: format!("All dependencies completed (last: {completed_id})"),
            });
        }

        resolution
    }
}

/// Finds a dependency cycle among `tasks`, returning the task identifiers on
/// the cycle in traversal order.
#[must_use]
pub fn detect_cycle(tasks: &[Task]) -> Option<Vec<TaskId>> {
    let graph: HashMap<TaskId, Vec<TaskId>> = tasks
        .iter()
        .map(|task| (task.id(), task.dependencies().to_vec()))
        .collect();

    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut path = Vec::new();

    let mut roots: Vec<TaskId> = graph.keys().copied().collect();
    roots.sort();
    for root in roots {
        if !visited.contains(&root)
            && visit(root, &graph, &mut visited, &mut on_stack, &mut path)
        {
            return Some(path);
        }
    }
    None
}

fn visit(
    node: TaskId,
    graph: &HashMap<TaskId, Vec<TaskId>>,
    visited: &mut HashSet<TaskId>,
    on_stack: &mut HashSet<TaskId>,
    path: &mut Vec<TaskId>,
) -> bool {
    visited.insert(node);
    on_stack.insert(node);
    path.push(node);

    if let Some(neighbours) = graph.get(&node) {
        for neighbour in neighbours {
            if on_stack.contains(neighbour) {
                if let Some(start) = path.iter().position(|id| id == neighbour) {
                    path.drain(..start);
                }
                return true;
            }
            if !visited.contains(neighbour) && visit(*neighbour, graph, visited, on_stack, path) {
                return true;
            }
        }
    }

    on_stack.remove(&node);
    path.pop();
    false
}
