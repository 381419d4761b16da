//! Hierarchical context resolution and delegation.
//!
//! Contexts exist at four levels (global, project, branch, task). Data
//! inherits downward through [`services::ContextHierarchyService`] and is
//! promoted upward through [`services::ContextDelegationService`], which
//! scores each request and either applies it or queues it for review. The
//! module follows the same hexagonal split as [`crate::task`]:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
