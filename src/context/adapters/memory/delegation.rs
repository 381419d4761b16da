//! In-memory delegation repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::{
    domain::{Delegation, DelegationId, DelegationStatus},
    ports::{DelegationRepository, DelegationRepositoryError, DelegationRepositoryResult},
};

/// Thread-safe in-memory delegation repository.
///
/// The compare-and-set in [`DelegationRepository::update`] runs under a
/// single write lock, so concurrent reviews serialise.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDelegationRepository {
    state: Arc<RwLock<InMemoryDelegationState>>,
}

#[derive(Debug, Default)]
struct InMemoryDelegationState {
    delegations: HashMap<DelegationId, Delegation>,
    insertion_order: Vec<DelegationId>,
}

impl InMemoryDelegationRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> DelegationRepositoryError {
    DelegationRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl DelegationRepository for InMemoryDelegationRepository {
    async fn store(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.delegations.contains_key(&delegation.id()) {
            return Err(DelegationRepositoryError::Duplicate(delegation.id()));
        }
        state.insertion_order.push(delegation.id());
        state.delegations.insert(delegation.id(), delegation.clone());
        Ok(())
    }

    async fn update(
        &self,
        delegation: &Delegation,
        expected_status: DelegationStatus,
    ) -> DelegationRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let slot = state
            .delegations
            .get_mut(&delegation.id())
            .ok_or(DelegationRepositoryError::NotFound(delegation.id()))?;
        if slot.status() != expected_status {
            return Err(DelegationRepositoryError::Conflict {
                id: delegation.id(),
                expected: expected_status,
                actual: slot.status(),
            });
        }
        *slot = delegation.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: DelegationId) -> DelegationRepositoryResult<Option<Delegation>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.delegations.get(&id).cloned())
    }

    async fn find_pending(&self, limit: usize) -> DelegationRepositoryResult<Vec<Delegation>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .insertion_order
            .iter()
            .filter_map(|id| state.delegations.get(id))
            .filter(|delegation| delegation.status() == DelegationStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_pending(&self) -> DelegationRepositoryResult<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .delegations
            .values()
            .filter(|delegation| delegation.status() == DelegationStatus::Pending)
            .count())
    }
}
