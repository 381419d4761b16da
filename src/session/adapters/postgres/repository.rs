//! `PostgreSQL` repository implementation for work sessions.

use super::{
    models::{NewWorkSessionRow, WorkSessionRow},
    schema::work_sessions,
};
use crate::session::{
    domain::{PersistedWorkSessionData, SessionStatus, WorkSession, WorkSessionId},
    ports::{WorkSessionRepository, WorkSessionRepositoryError, WorkSessionRepositoryResult},
};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by the session adapter.
pub type SessionPgPool = Pool<ConnectionManager<PgConnection>>;

const LIVE_STATUSES: [&str; 2] = ["active", "paused"];

/// `PostgreSQL`-backed work session repository.
#[derive(Debug, Clone)]
pub struct PostgresWorkSessionRepository {
    pool: SessionPgPool,
}

impl PostgresWorkSessionRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: SessionPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> WorkSessionRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> WorkSessionRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(WorkSessionRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(WorkSessionRepositoryError::persistence)?
    }
}

/// Error type threaded through the store transaction.
enum StoreError {
    Diesel(DieselError),
    Repository(WorkSessionRepositoryError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        Self::Diesel(err)
    }
}

impl From<StoreError> for WorkSessionRepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Diesel(failure) => Self::persistence(failure),
            StoreError::Repository(inner) => inner,
        }
    }
}

#[async_trait]
impl WorkSessionRepository for PostgresWorkSessionRepository {
    async fn store(&self, session: &WorkSession) -> WorkSessionRepositoryResult<()> {
        let session_id = session.id();
        let task_id = session.task_id();
        let live = session.status().is_live();
        let new_row = to_session_row(session)?;
        self.run_blocking(move |connection| {
            connection
                .build_transaction()
                .serializable()
                .run::<_, StoreError, _>(|tx| {
                    if live {
                        let holder = work_sessions::table
                            .filter(work_sessions::task_id.eq(task_id.into_inner()))
                            .filter(work_sessions::status.eq_any(LIVE_STATUSES))
                            .select(work_sessions::id)
                            .first::<uuid::Uuid>(tx)
                            .optional()?;
                        if let Some(existing) = holder {
                            return Err(StoreError::Repository(
                                WorkSessionRepositoryError::LiveSessionExists {
                                    task_id,
                                    session_id: WorkSessionId::from_uuid(existing),
                                },
                            ));
                        }
                    }
                    diesel::insert_into(work_sessions::table)
                        .values(&new_row)
                        .execute(tx)
                        .map_err(|err| match err {
                            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                                StoreError::Repository(WorkSessionRepositoryError::Duplicate(
                                    session_id,
                                ))
                            }
                            other => StoreError::Diesel(other),
                        })?;
                    Ok(())
                })
                .map_err(WorkSessionRepositoryError::from)
        })
        .await
    }

    async fn update(&self, session: &WorkSession) -> WorkSessionRepositoryResult<()> {
        let session_id = session.id();
        let row = to_session_row(session)?;
        self.run_blocking(move |connection| {
            let affected = diesel::update(work_sessions::table.find(session_id.into_inner()))
                .set(&row)
                .execute(connection)
                .map_err(WorkSessionRepositoryError::persistence)?;
            if affected == 0 {
                return Err(WorkSessionRepositoryError::NotFound(session_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: WorkSessionId,
    ) -> WorkSessionRepositoryResult<Option<WorkSession>> {
        self.run_blocking(move |connection| {
            let row = work_sessions::table
                .find(id.into_inner())
                .select(WorkSessionRow::as_select())
                .first::<WorkSessionRow>(connection)
                .optional()
                .map_err(WorkSessionRepositoryError::persistence)?;
            row.map(row_to_session).transpose()
        })
        .await
    }

    async fn find_live_by_task(
        &self,
        task_id: TaskId,
    ) -> WorkSessionRepositoryResult<Option<WorkSession>> {
        self.run_blocking(move |connection| {
            let row = work_sessions::table
                .filter(work_sessions::task_id.eq(task_id.into_inner()))
                .filter(work_sessions::status.eq_any(LIVE_STATUSES))
                .order(work_sessions::started_at.asc())
                .select(WorkSessionRow::as_select())
                .first::<WorkSessionRow>(connection)
                .optional()
                .map_err(WorkSessionRepositoryError::persistence)?;
            row.map(row_to_session).transpose()
        })
        .await
    }

    async fn find_live(&self) -> WorkSessionRepositoryResult<Vec<WorkSession>> {
        self.run_blocking(move |connection| {
            work_sessions::table
                .filter(work_sessions::status.eq_any(LIVE_STATUSES))
                .order((work_sessions::started_at.asc(), work_sessions::id.asc()))
                .select(WorkSessionRow::as_select())
                .load::<WorkSessionRow>(connection)
                .map_err(WorkSessionRepositoryError::persistence)?
                .into_iter()
                .map(row_to_session)
                .collect()
        })
        .await
    }
}

pub(super) fn to_session_row(
    session: &WorkSession,
) -> WorkSessionRepositoryResult<NewWorkSessionRow> {
    Ok(NewWorkSessionRow {
        id: session.id().into_inner(),
        agent_id: session.agent_id().to_owned(),
        task_id: session.task_id().into_inner(),
        status: session.status().as_str().to_owned(),
        started_at: session.started_at(),
        paused_at: session.paused_at(),
        paused_secs: session.paused_secs(),
        max_duration_secs: session.max_duration_secs(),
        ended_at: session.ended_at(),
        locked_resources: serde_json::to_value(session.locked_resources())
            .map_err(WorkSessionRepositoryError::persistence)?,
        progress: serde_json::to_value(session.progress())
            .map_err(WorkSessionRepositoryError::persistence)?,
        summary: session.summary().map(str::to_owned),
        cancel_reason: session.cancel_reason().map(str::to_owned),
        updated_at: session.updated_at(),
    })
}

pub(super) fn row_to_session(row: WorkSessionRow) -> WorkSessionRepositoryResult<WorkSession> {
    let status = SessionStatus::try_from(row.status.as_str())
        .map_err(WorkSessionRepositoryError::persistence)?;
    let locked_resources = serde_json::from_value(row.locked_resources)
        .map_err(WorkSessionRepositoryError::persistence)?;
    let progress =
        serde_json::from_value(row.progress).map_err(WorkSessionRepositoryError::persistence)?;
    Ok(WorkSession::from_persisted(PersistedWorkSessionData {
        id: WorkSessionId::from_uuid(row.id),
        agent_id: row.agent_id,
        task_id: TaskId::from_uuid(row.task_id),
        status,
        started_at: row.started_at,
        paused_at: row.paused_at,
        paused_secs: row.paused_secs,
        max_duration_secs: row.max_duration_secs,
        ended_at: row.ended_at,
        locked_resources,
        progress,
        summary: row.summary,
        cancel_reason: row.cancel_reason,
        updated_at: row.updated_at,
    }))
}
