//! Context hierarchy management: creation, inheritance, propagation.

use crate::context::{
    domain::{
        Context, ContextDomainError, ContextId, ContextLevel, ContextRef, deep_merge,
    },
    ports::{ContextRepository, ContextRepositoryError},
};
use mockable::Clock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors returned by context hierarchy operations.
#[derive(Debug, Clone, Error)]
pub enum ContextServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ContextDomainError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ContextRepositoryError),

    /// The requested context does not exist.
    #[error("context not found: {0}")]
    NotFound(ContextRef),

    /// The parent of a new or resolved context does not exist.
    #[error("parent context not found: {0}")]
    ParentNotFound(ContextRef),

    /// A context with children cannot be deleted.
    #[error("context {context} still has {children} child context(s)")]
    HasChildren {
        /// Context whose deletion was refused.
        context: ContextRef,
        /// Number of direct children.
        children: usize,
    },

    /// The global context cannot be deleted.
    #[error("the global context cannot be deleted")]
    GlobalDeletion,
}

/// Result type for context hierarchy operations.
pub type ContextServiceResult<T> = Result<T, ContextServiceError>;

/// Read-modify-write attempts before a version conflict is reported.
const WRITE_ATTEMPTS: usize = 3;

/// Effective data of a context after inheritance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedContext {
    /// Context that was resolved.
    pub context: ContextRef,
    /// Contributing contexts, broadest first, ending with `context`.
    pub chain: Vec<ContextRef>,
    /// Merged payload.
    pub data: Map<String, Value>,
}

/// Outcome of an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextUpdate {
    /// Updated context.
    pub context: Context,
    /// Descendants touched by propagation, breadth-first.
    pub propagated_to: Vec<ContextRef>,
}

/// Creates, resolves and updates contexts across the four levels.
#[derive(Clone)]
pub struct ContextHierarchyService<R, C>
where
    R: ContextRepository,
    C: Clock + Send + Sync,
{
    contexts: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> ContextHierarchyService<R, C>
where
    R: ContextRepository,
    C: Clock + Send + Sync,
{
    /// Creates a hierarchy service.
    #[must_use]
    pub const fn new(contexts: Arc<R>, clock: Arc<C>) -> Self {
        Self { contexts, clock }
    }

    /// Returns the global context, creating an empty one on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ContextServiceError::Repository`] when storage fails.
    pub async fn ensure_global(&self) -> ContextServiceResult<Context> {
        if let Some(existing) = self
            .contexts
            .find(ContextLevel::Global, ContextId::GLOBAL)
            .await?
        {
            return Ok(existing);
        }
        let global = Context::global(Map::new(), &*self.clock);
        match self.contexts.store(&global).await {
            Ok(()) => {
                info!("global context created");
                Ok(global)
            }
            Err(ContextRepositoryError::Duplicate(_)) => self
                .contexts
                .find(ContextLevel::Global, ContextId::GLOBAL)
                .await?
                .ok_or(ContextServiceError::NotFound(ContextRef::global())),
            Err(err) => Err(err.into()),
        }
    }

    /// Creates a context.
    ///
    /// A project context without an explicit parent hangs off the global
    /// context, which is created on demand. Other parents must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ContextServiceError::Domain`] for invalid level or parent
    /// combinations, [`ContextServiceError::ParentNotFound`] for a missing
    /// parent, and [`ContextServiceError::Repository`] for duplicates or
    /// storage failures.
    pub async fn create_context(
        &self,
        level: ContextLevel,
        id: ContextId,
        parent: Option<ContextRef>,
        data: Map<String, Value>,
    ) -> ContextServiceResult<Context> {
        let parent_ref = match (level, parent) {
            (ContextLevel::Project, None) => Some(ContextRef::global()),
            (_, explicit) => explicit,
        };
        let context = Context::new(level, id, parent_ref, data, &*self.clock)?;

        if let Some(parent_pointer) = context.parent() {
            if parent_pointer.level == ContextLevel::Global {
                self.ensure_global().await?;
            } else if self
                .contexts
                .find(parent_pointer.level, parent_pointer.id)
                .await?
                .is_none()
            {
                return Err(ContextServiceError::ParentNotFound(parent_pointer));
            }
        }

        self.contexts.store(&context).await?;
        info!(context = %context.reference(), "context created");
        Ok(context)
    }

    /// Loads a context.
    ///
    /// # Errors
    ///
    /// Returns [`ContextServiceError::NotFound`] when it does not exist.
    pub async fn get_context(
        &self,
        level: ContextLevel,
        id: ContextId,
    ) -> ContextServiceResult<Context> {
        self.contexts
            .find(level, id)
            .await?
            .ok_or(ContextServiceError::NotFound(ContextRef::new(level, id)))
    }

    /// Merges the payloads from the global context down to the requested
    /// one. Narrower levels win on conflicting scalar keys.
    ///
    /// # Errors
    ///
    /// Returns [`ContextServiceError::NotFound`] when the context is missing
    /// and [`ContextServiceError::ParentNotFound`] when an ancestor is.
    pub async fn resolve_context(
        &self,
        level: ContextLevel,
        id: ContextId,
    ) -> ContextServiceResult<ResolvedContext> {
        let target = self.get_context(level, id).await?;
        let mut lineage = vec![target];
        while lineage.len() <= ContextLevel::ALL.len() {
            let Some(parent_pointer) = lineage.last().and_then(Context::parent) else {
                break;
            };
            let parent = self
                .contexts
                .find(parent_pointer.level, parent_pointer.id)
                .await?
                .ok_or(ContextServiceError::ParentNotFound(parent_pointer))?;
            lineage.push(parent);
        }

        let mut data = Map::new();
        let mut chain = Vec::with_capacity(lineage.len());
        for ancestor in lineage.iter().rev() {
            deep_merge(&mut data, ancestor.data());
            chain.push(ancestor.reference());
        }
        Ok(ResolvedContext {
            context: ContextRef::new(level, id),
            chain,
            data,
        })
    }

    /// Lists the direct children of a context.
    ///
    /// # Errors
    ///
    /// Returns [`ContextServiceError::Repository`] when storage fails.
    pub async fn list_children(&self, parent: ContextRef) -> ContextServiceResult<Vec<Context>> {
        Ok(self.contexts.find_children(parent).await?)
    }

    /// Deep-merges `changes` into a context.
    ///
    /// The write is checked against the version that was read; a concurrent
    /// writer causes the merge to be replayed on the fresh copy. With
    /// `propagate`, every descendant is touched breadth-first so that
    /// freshness checks below the change observe it.
    ///
    /// # Errors
    ///
    /// Returns [`ContextServiceError::NotFound`] when the context is missing
    /// and [`ContextServiceError::Repository`] when storage fails or writers
    /// keep conflicting.
    pub async fn update_context(
        &self,
        level: ContextLevel,
        id: ContextId,
        changes: &Map<String, Value>,
        propagate: bool,
    ) -> ContextServiceResult<ContextUpdate> {
        let clock = &*self.clock;
        let context = self
            .modify(level, id, |current| current.merge(changes, clock))
            .await?;
        debug!(context = %context.reference(), version = context.version(), "context updated");

        let propagated_to = if propagate {
            self.touch_descendants(context.reference()).await?
        } else {
            Vec::new()
        };
        Ok(ContextUpdate {
            context,
            propagated_to,
        })
    }

    /// Deletes a context without children.
    ///
    /// # Errors
    ///
    /// Returns [`ContextServiceError::GlobalDeletion`] for the global
    /// context, [`ContextServiceError::HasChildren`] while children exist,
    /// and [`ContextServiceError::NotFound`] when it does not exist.
    pub async fn delete_context(
        &self,
        level: ContextLevel,
        id: ContextId,
    ) -> ContextServiceResult<()> {
        if level == ContextLevel::Global {
            return Err(ContextServiceError::GlobalDeletion);
        }
        let reference = ContextRef::new(level, id);
        let children = self.contexts.find_children(reference).await?;
        if !children.is_empty() {
            return Err(ContextServiceError::HasChildren {
                context: reference,
                children: children.len(),
            });
        }
        self.contexts.delete(level, id).await.map_err(|err| match err {
            ContextRepositoryError::NotFound(missing) => ContextServiceError::NotFound(missing),
            other => other.into(),
        })?;
        info!(context = %reference, "context deleted");
        Ok(())
    }

    async fn touch_descendants(&self, root: ContextRef) -> ContextServiceResult<Vec<ContextRef>> {
        let mut queue = VecDeque::from([root]);
        let mut touched = Vec::new();
        while let Some(parent) = queue.pop_front() {
            for child in self.contexts.find_children(parent).await? {
                let reference = child.reference();
                let clock = &*self.clock;
                self.modify(reference.level, reference.id, |current| current.touch(clock))
                    .await?;
                touched.push(reference);
                queue.push_back(reference);
            }
        }
        Ok(touched)
    }

    async fn modify<F>(
        &self,
        level: ContextLevel,
        id: ContextId,
        mut change: F,
    ) -> ContextServiceResult<Context>
    where
        F: FnMut(&mut Context) + Send,
    {
        for attempt in 1..WRITE_ATTEMPTS {
            match self.write_once(level, id, &mut change).await {
                Err(ContextServiceError::Repository(ContextRepositoryError::Conflict {
                    expected,
                    actual,
                    ..
                })) => {
                    debug!(
                        context = %ContextRef::new(level, id),
                        attempt,
                        expected,
                        actual,
                        "context write conflict; retrying"
                    );
                }
                outcome => return outcome,
            }
        }
        self.write_once(level, id, &mut change).await
    }

    async fn write_once<F>(
        &self,
        level: ContextLevel,
        id: ContextId,
        change: &mut F,
    ) -> ContextServiceResult<Context>
    where
        F: FnMut(&mut Context) + Send,
    {
        let mut context = self.get_context(level, id).await?;
        let expected = context.version();
        change(&mut context);
        self.contexts.update(&context, expected).await?;
        Ok(context)
    }
}
