//! Port contracts for the context hierarchy and delegation queue.

pub mod repository;

pub use repository::{
    ContextRepository, ContextRepositoryError, ContextRepositoryResult, DelegationRepository,
    DelegationRepositoryError, DelegationRepositoryResult,
};
