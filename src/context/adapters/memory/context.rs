//! In-memory context repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::{
    domain::{Context, ContextId, ContextLevel, ContextRef},
    ports::{ContextRepository, ContextRepositoryError, ContextRepositoryResult},
};

/// Thread-safe in-memory context repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContextRepository {
    state: Arc<RwLock<InMemoryContextState>>,
}

#[derive(Debug, Default)]
struct InMemoryContextState {
    contexts: HashMap<ContextRef, Context>,
    insertion_order: Vec<ContextRef>,
}

impl InMemoryContextRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> ContextRepositoryError {
    ContextRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ContextRepository for InMemoryContextRepository {
    async fn store(&self, context: &Context) -> ContextRepositoryResult<()> {
        let key = context.reference();
        let mut state = self.state.write().map_err(lock_error)?;
        if state.contexts.contains_key(&key) {
            return Err(ContextRepositoryError::Duplicate(key));
        }
        state.insertion_order.push(key);
        state.contexts.insert(key, context.clone());
        Ok(())
    }

    async fn update(
        &self,
        context: &Context,
        expected_version: u64,
    ) -> ContextRepositoryResult<()> {
        let key = context.reference();
        let mut state = self.state.write().map_err(lock_error)?;
        let slot = state
            .contexts
            .get_mut(&key)
            .ok_or(ContextRepositoryError::NotFound(key))?;
        if slot.version() != expected_version {
            return Err(ContextRepositoryError::Conflict {
                context: key,
                expected: expected_version,
                actual: slot.version(),
            });
        }
        *slot = context.clone();
        Ok(())
    }

    async fn find(
        &self,
        level: ContextLevel,
        id: ContextId,
    ) -> ContextRepositoryResult<Option<Context>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.contexts.get(&ContextRef::new(level, id)).cloned())
    }

    async fn find_children(&self, parent: ContextRef) -> ContextRepositoryResult<Vec<Context>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .insertion_order
            .iter()
            .filter_map(|key| state.contexts.get(key))
            .filter(|context| context.parent() == Some(parent))
            .cloned()
            .collect())
    }

    async fn delete(&self, level: ContextLevel, id: ContextId) -> ContextRepositoryResult<()> {
        let key = ContextRef::new(level, id);
        let mut state = self.state.write().map_err(lock_error)?;
        if state.contexts.remove(&key).is_none() {
            return Err(ContextRepositoryError::NotFound(key));
        }
        state.insertion_order.retain(|existing| *existing != key);
        Ok(())
    }
}
