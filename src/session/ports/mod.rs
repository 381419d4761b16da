//! Port contracts for work session persistence.

pub mod repository;

pub use repository::{
    WorkSessionRepository, WorkSessionRepositoryError, WorkSessionRepositoryResult,
};
