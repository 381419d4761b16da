//! `PostgreSQL` repository implementations for task storage.

use super::{
    models::{NewSubtaskRow, NewTaskEventRow, NewTaskRow, SubtaskRow, TaskRow},
    schema::{subtasks, task_events, tasks},
};
use crate::context::domain::ContextId;
use crate::task::{
    domain::{
        BranchId, PersistedSubtaskData, PersistedTaskData, ProjectId, Subtask, SubtaskId, Task,
        TaskEvent, TaskId, TaskPriority, TaskStatus,
    },
    ports::{
        SubtaskRepository, TaskEventError, TaskEventSink, TaskRepository, TaskRepositoryError,
        TaskRepositoryResult,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::Value;

/// `PostgreSQL` connection pool type used by the adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

async fn run_blocking<F, T>(pool: &TaskPgPool, f: F) -> TaskRepositoryResult<T>
where
    F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
        f(&mut connection)
    })
    .await
    .map_err(TaskRepositoryError::persistence)?
}

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let new_row = to_task_row(task)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let row = to_task_row(task)?;
        run_blocking(&self.pool, move |connection| {
            let affected = diesel::update(tasks::table.find(task_id.into_inner()))
                .set(&row)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            if affected == 0 {
                return Err(TaskRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        run_blocking(&self.pool, move |connection| {
            let row = tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_all(&self) -> TaskRepositoryResult<Vec<Task>> {
        run_blocking(&self.pool, move |connection| {
            tasks::table
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }
}

/// `PostgreSQL`-backed subtask repository.
#[derive(Debug, Clone)]
pub struct PostgresSubtaskRepository {
    pool: TaskPgPool,
}

impl PostgresSubtaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubtaskRepository for PostgresSubtaskRepository {
    async fn store(&self, subtask: &Subtask) -> TaskRepositoryResult<()> {
        let subtask_id = subtask.id();
        let new_row = to_subtask_row(subtask)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(subtasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateSubtask(subtask_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, subtask: &Subtask) -> TaskRepositoryResult<()> {
        let subtask_id = subtask.id();
        let row = to_subtask_row(subtask)?;
        run_blocking(&self.pool, move |connection| {
            let affected = diesel::update(subtasks::table.find(subtask_id.into_inner()))
                .set(&row)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            if affected == 0 {
                return Err(TaskRepositoryError::SubtaskNotFound(subtask_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: SubtaskId) -> TaskRepositoryResult<Option<Subtask>> {
        run_blocking(&self.pool, move |connection| {
            let row = subtasks::table
                .find(id.into_inner())
                .select(SubtaskRow::as_select())
                .first::<SubtaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_subtask).transpose()
        })
        .await
    }

    async fn find_by_parent_task_id(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<Subtask>> {
        run_blocking(&self.pool, move |connection| {
            subtasks::table
                .filter(subtasks::parent_task_id.eq(task_id.into_inner()))
                .order((subtasks::created_at.asc(), subtasks::id.asc()))
                .select(SubtaskRow::as_select())
                .load::<SubtaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?
                .into_iter()
                .map(row_to_subtask)
                .collect()
        })
        .await
    }
}

/// `PostgreSQL`-backed append-only event log.
#[derive(Debug, Clone)]
pub struct PostgresTaskEventSink {
    pool: TaskPgPool,
}

impl PostgresTaskEventSink {
    /// Creates a new sink from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskEventSink for PostgresTaskEventSink {
    async fn publish(&self, event: &TaskEvent) -> Result<(), TaskEventError> {
        let row = to_event_row(event);
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(task_events::table)
                .values(&row)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            Ok(())
        })
        .await
        .map_err(TaskEventError::publish)
    }
}

pub(super) fn to_task_row(task: &Task) -> TaskRepositoryResult<NewTaskRow> {
    Ok(NewTaskRow {
        id: task.id().into_inner(),
        title: task.title().to_owned(),
        description: task.description().to_owned(),
        status: task.status().as_str().to_owned(),
        priority: task.priority().as_str().to_owned(),
        assignees: to_json(task.assignees())?,
        labels: to_json(task.labels())?,
        dependencies: to_json(task.dependencies())?,
        estimated_effort: task.estimated_effort().map(str::to_owned),
        due_date: task.due_date(),
        project_id: task.project_id().map(ProjectId::into_inner),
        branch_id: task.branch_id().map(BranchId::into_inner),
        context_id: task.context_id().map(ContextId::into_inner),
        completion_summary: task.completion_summary().map(str::to_owned),
        completed_at: task.completed_at(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

pub(super) fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let status =
        TaskStatus::try_from(row.status.as_str()).map_err(TaskRepositoryError::persistence)?;
    let priority =
        TaskPriority::try_from(row.priority.as_str()).map_err(TaskRepositoryError::persistence)?;
    let data = PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        title: row.title,
        description: row.description,
        status,
        priority,
        assignees: from_json(row.assignees)?,
        labels: from_json(row.labels)?,
        dependencies: from_json(row.dependencies)?,
        estimated_effort: row.estimated_effort,
        due_date: row.due_date,
        project_id: row.project_id.map(ProjectId::from_uuid),
        branch_id: row.branch_id.map(BranchId::from_uuid),
        context_id: row.context_id.map(ContextId::from_uuid),
        completion_summary: row.completion_summary,
        completed_at: row.completed_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    Ok(Task::from_persisted(data))
}

pub(super) fn to_subtask_row(subtask: &Subtask) -> TaskRepositoryResult<NewSubtaskRow> {
    Ok(NewSubtaskRow {
        id: subtask.id().into_inner(),
        parent_task_id: subtask.parent_task_id().into_inner(),
        title: subtask.title().to_owned(),
        status: subtask.status().as_str().to_owned(),
        progress_percentage: i16::from(subtask.progress_percentage()),
        assignees: to_json(subtask.assignees())?,
        created_at: subtask.created_at(),
        updated_at: subtask.updated_at(),
    })
}

pub(super) fn row_to_subtask(row: SubtaskRow) -> TaskRepositoryResult<Subtask> {
    let status =
        TaskStatus::try_from(row.status.as_str()).map_err(TaskRepositoryError::persistence)?;
    let progress_percentage =
        u8::try_from(row.progress_percentage).map_err(TaskRepositoryError::persistence)?;
    Ok(Subtask::from_persisted(PersistedSubtaskData {
        id: SubtaskId::from_uuid(row.id),
        parent_task_id: TaskId::from_uuid(row.parent_task_id),
        title: row.title,
        status,
        progress_percentage,
        assignees: from_json(row.assignees)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(super) fn to_event_row(event: &TaskEvent) -> NewTaskEventRow {
    NewTaskEventRow {
        event_id: event.event_id,
        task_id: event.task_id.into_inner(),
        kind: event.kind.as_str().to_owned(),
        metadata: Value::Object(event.metadata.clone()),
        occurred_at: event.occurred_at,
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> TaskRepositoryResult<Value> {
    serde_json::to_value(value).map_err(TaskRepositoryError::persistence)
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> TaskRepositoryResult<T> {
    serde_json::from_value(value).map_err(TaskRepositoryError::persistence)
}
