//! In-memory adapters for contexts and delegations.

mod context;
mod delegation;

pub use context::InMemoryContextRepository;
pub use delegation::InMemoryDelegationRepository;
