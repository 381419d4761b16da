//! `PostgreSQL` repository implementations for contexts and delegations.

use super::{
    models::{ContextRow, DelegationRow, NewContextRow, NewDelegationRow},
    schema::{contexts, delegations},
};
use crate::context::{
    domain::{
        Context, ContextId, ContextLevel, ContextRef, Delegation, DelegationId, DelegationStatus,
        DelegationTrigger, ImpactAssessment, PersistedContextData, PersistedDelegationData,
    },
    ports::{
        ContextRepository, ContextRepositoryError, ContextRepositoryResult, DelegationRepository,
        DelegationRepositoryError, DelegationRepositoryResult,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::{Map, Value};

/// `PostgreSQL` connection pool type used by the context adapters.
pub type ContextPgPool = Pool<ConnectionManager<PgConnection>>;

/// Repository errors that can wrap an arbitrary persistence failure.
trait PersistenceFailure: Sized {
    fn from_failure(err: impl std::error::Error + Send + Sync + 'static) -> Self;
}

impl PersistenceFailure for ContextRepositoryError {
    fn from_failure(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::persistence(err)
    }
}

impl PersistenceFailure for DelegationRepositoryError {
    fn from_failure(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::persistence(err)
    }
}

async fn run_blocking<F, T, E>(pool: &ContextPgPool, f: F) -> Result<T, E>
where
    F: FnOnce(&mut PgConnection) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: PersistenceFailure + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(E::from_failure)?;
        f(&mut connection)
    })
    .await
    .map_err(E::from_failure)?
}

/// `PostgreSQL`-backed context repository.
#[derive(Debug, Clone)]
pub struct PostgresContextRepository {
    pool: ContextPgPool,
}

impl PostgresContextRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ContextPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContextRepository for PostgresContextRepository {
    async fn store(&self, context: &Context) -> ContextRepositoryResult<()> {
        let key = context.reference();
        let row = to_context_row(context)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(contexts::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ContextRepositoryError::Duplicate(key)
                    }
                    _ => ContextRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(
        &self,
        context: &Context,
        expected_version: u64,
    ) -> ContextRepositoryResult<()> {
        let key = context.reference();
        let row = to_context_row(context)?;
        let expected =
            i64::try_from(expected_version).map_err(ContextRepositoryError::persistence)?;
        run_blocking(&self.pool, move |connection| {
            let affected = diesel::update(
                contexts::table
                    .filter(contexts::level.eq(key.level.as_str()))
                    .filter(contexts::id.eq(key.id.into_inner()))
                    .filter(contexts::version.eq(expected)),
            )
            .set(&row)
            .execute(connection)
            .map_err(ContextRepositoryError::persistence)?;
            if affected > 0 {
                return Ok(());
            }
            let stored = contexts::table
                .find((key.level.as_str(), key.id.into_inner()))
                .select(contexts::version)
                .first::<i64>(connection)
                .optional()
                .map_err(ContextRepositoryError::persistence)?;
            match stored {
                None => Err(ContextRepositoryError::NotFound(key)),
                Some(actual) => Err(ContextRepositoryError::Conflict {
                    context: key,
                    expected: expected_version,
                    actual: u64::try_from(actual).map_err(ContextRepositoryError::persistence)?,
                }),
            }
        })
        .await
    }

    async fn find(
        &self,
        level: ContextLevel,
        id: ContextId,
    ) -> ContextRepositoryResult<Option<Context>> {
        run_blocking(&self.pool, move |connection| {
            let row = contexts::table
                .find((level.as_str(), id.into_inner()))
                .select(ContextRow::as_select())
                .first::<ContextRow>(connection)
                .optional()
                .map_err(ContextRepositoryError::persistence)?;
            row.map(row_to_context).transpose()
        })
        .await
    }

    async fn find_children(&self, parent: ContextRef) -> ContextRepositoryResult<Vec<Context>> {
        run_blocking(&self.pool, move |connection| {
            contexts::table
                .filter(contexts::parent_level.eq(parent.level.as_str()))
                .filter(contexts::parent_id.eq(parent.id.into_inner()))
                .order(contexts::created_at.asc())
                .select(ContextRow::as_select())
                .load::<ContextRow>(connection)
                .map_err(ContextRepositoryError::persistence)?
                .into_iter()
                .map(row_to_context)
                .collect()
        })
        .await
    }

    async fn delete(&self, level: ContextLevel, id: ContextId) -> ContextRepositoryResult<()> {
        run_blocking(&self.pool, move |connection| {
            let affected =
                diesel::delete(contexts::table.find((level.as_str(), id.into_inner())))
                    .execute(connection)
                    .map_err(ContextRepositoryError::persistence)?;
            if affected == 0 {
                return Err(ContextRepositoryError::NotFound(ContextRef::new(level, id)));
            }
            Ok(())
        })
        .await
    }
}

/// `PostgreSQL`-backed delegation repository.
///
/// Status changes run in a transaction that locks the row with
/// `SELECT ... FOR UPDATE` before comparing the stored status.
#[derive(Debug, Clone)]
pub struct PostgresDelegationRepository {
    pool: ContextPgPool,
}

impl PostgresDelegationRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ContextPgPool) -> Self {
        Self { pool }
    }
}

/// Error type threaded through the compare-and-set transaction.
enum CasError {
    Diesel(DieselError),
    Repository(DelegationRepositoryError),
}

impl From<DieselError> for CasError {
    fn from(err: DieselError) -> Self {
        Self::Diesel(err)
    }
}

impl From<CasError> for DelegationRepositoryError {
    fn from(err: CasError) -> Self {
        match err {
            CasError::Diesel(source) => Self::persistence(source),
            CasError::Repository(inner) => inner,
        }
    }
}

#[async_trait]
impl DelegationRepository for PostgresDelegationRepository {
    async fn store(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let id = delegation.id();
        let row = to_delegation_row(delegation)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(delegations::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        DelegationRepositoryError::Duplicate(id)
                    }
                    _ => DelegationRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(
        &self,
        delegation: &Delegation,
        expected_status: DelegationStatus,
    ) -> DelegationRepositoryResult<()> {
        let id = delegation.id();
        let row = to_delegation_row(delegation)?;
        run_blocking(&self.pool, move |connection| {
            connection
                .transaction::<_, CasError, _>(|tx| {
                    let stored = delegations::table
                        .find(id.into_inner())
                        .select(delegations::status)
                        .for_update()
                        .first::<String>(tx)
                        .optional()?
                        .ok_or(CasError::Repository(DelegationRepositoryError::NotFound(id)))?;
                    let actual = DelegationStatus::try_from(stored.as_str()).map_err(|err| {
                        CasError::Repository(DelegationRepositoryError::persistence(err))
                    })?;
                    if actual != expected_status {
                        return Err(CasError::Repository(DelegationRepositoryError::Conflict {
                            id,
                            expected: expected_status,
                            actual,
                        }));
                    }
                    diesel::update(delegations::table.find(id.into_inner()))
                        .set(&row)
                        .execute(tx)?;
                    Ok(())
                })
                .map_err(DelegationRepositoryError::from)
        })
        .await
    }

    async fn find_by_id(&self, id: DelegationId) -> DelegationRepositoryResult<Option<Delegation>> {
        run_blocking(&self.pool, move |connection| {
            let row = delegations::table
                .find(id.into_inner())
                .select(DelegationRow::as_select())
                .first::<DelegationRow>(connection)
                .optional()
                .map_err(DelegationRepositoryError::persistence)?;
            row.map(row_to_delegation).transpose()
        })
        .await
    }

    async fn find_pending(&self, limit: usize) -> DelegationRepositoryResult<Vec<Delegation>> {
        let row_limit = i64::try_from(limit).unwrap_or(i64::MAX);
        run_blocking(&self.pool, move |connection| {
            delegations::table
                .filter(delegations::status.eq(DelegationStatus::Pending.as_str()))
                .order((delegations::created_at.asc(), delegations::id.asc()))
                .limit(row_limit)
                .select(DelegationRow::as_select())
                .load::<DelegationRow>(connection)
                .map_err(DelegationRepositoryError::persistence)?
                .into_iter()
                .map(row_to_delegation)
                .collect()
        })
        .await
    }

    async fn count_pending(&self) -> DelegationRepositoryResult<usize> {
        run_blocking(&self.pool, move |connection| {
            let count = delegations::table
                .filter(delegations::status.eq(DelegationStatus::Pending.as_str()))
                .count()
                .get_result::<i64>(connection)
                .map_err(DelegationRepositoryError::persistence)?;
            usize::try_from(count).map_err(DelegationRepositoryError::persistence)
        })
        .await
    }
}

pub(super) fn to_context_row(context: &Context) -> ContextRepositoryResult<NewContextRow> {
    let version = i64::try_from(context.version()).map_err(ContextRepositoryError::persistence)?;
    Ok(NewContextRow {
        level: context.level().as_str().to_owned(),
        id: context.id().into_inner(),
        parent_level: context.parent().map(|parent| parent.level.as_str().to_owned()),
        parent_id: context.parent().map(|parent| parent.id.into_inner()),
        data: Value::Object(context.data().clone()),
        version,
        created_at: context.created_at(),
        updated_at: context.updated_at(),
    })
}

pub(super) fn row_to_context(row: ContextRow) -> ContextRepositoryResult<Context> {
    let level =
        ContextLevel::try_from(row.level.as_str()).map_err(ContextRepositoryError::persistence)?;
    let parent = match (row.parent_level, row.parent_id) {
        (Some(parent_level), Some(parent_id)) => Some(ContextRef::new(
            ContextLevel::try_from(parent_level.as_str())
                .map_err(ContextRepositoryError::persistence)?,
            ContextId::from_uuid(parent_id),
        )),
        _ => None,
    };
    let version = u64::try_from(row.version).map_err(ContextRepositoryError::persistence)?;
    Ok(Context::from_persisted(PersistedContextData {
        id: ContextId::from_uuid(row.id),
        level,
        parent,
        data: object_or_empty(row.data),
        version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(super) fn to_delegation_row(
    delegation: &Delegation,
) -> DelegationRepositoryResult<NewDelegationRow> {
    let impact = delegation
        .impact()
        .map(serde_json::to_value)
        .transpose()
        .map_err(DelegationRepositoryError::persistence)?;
    Ok(NewDelegationRow {
        id: delegation.id().into_inner(),
        source_level: delegation.source().level.as_str().to_owned(),
        source_id: delegation.source().id.into_inner(),
        target_level: delegation.target().level.as_str().to_owned(),
        target_id: delegation.target().id.into_inner(),
        delegated_data: Value::Object(delegation.delegated_data().clone()),
        reason: delegation.reason().to_owned(),
        trigger_type: delegation.trigger().as_str().to_owned(),
        confidence_score: delegation.confidence_score(),
        impact,
        status: delegation.status().as_str().to_owned(),
        auto_approved: delegation.is_auto_approved(),
        reviewed_by: delegation.reviewed_by().map(str::to_owned),
        rejection_reason: delegation.rejection_reason().map(str::to_owned),
        created_at: delegation.created_at(),
        reviewed_at: delegation.reviewed_at(),
    })
}

pub(super) fn row_to_delegation(row: DelegationRow) -> DelegationRepositoryResult<Delegation> {
    let source_level = ContextLevel::try_from(row.source_level.as_str())
        .map_err(DelegationRepositoryError::persistence)?;
    let target_level = ContextLevel::try_from(row.target_level.as_str())
        .map_err(DelegationRepositoryError::persistence)?;
    let trigger = DelegationTrigger::try_from(row.trigger_type.as_str())
        .map_err(DelegationRepositoryError::persistence)?;
    let status = DelegationStatus::try_from(row.status.as_str())
        .map_err(DelegationRepositoryError::persistence)?;
    let impact = row
        .impact
        .map(serde_json::from_value::<ImpactAssessment>)
        .transpose()
        .map_err(DelegationRepositoryError::persistence)?;
    Ok(Delegation::from_persisted(PersistedDelegationData {
        id: DelegationId::from_uuid(row.id),
        source: ContextRef::new(source_level, ContextId::from_uuid(row.source_id)),
        target: ContextRef::new(target_level, ContextId::from_uuid(row.target_id)),
        delegated_data: object_or_empty(row.delegated_data),
        reason: row.reason,
        trigger,
        confidence_score: row.confidence_score,
        impact,
        status,
        auto_approved: row.auto_approved,
        reviewed_by: row.reviewed_by,
        rejection_reason: row.rejection_reason,
        created_at: row.created_at,
        reviewed_at: row.reviewed_at,
    }))
}

fn object_or_empty(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
