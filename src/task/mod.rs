//! Task lifecycle management.
//!
//! Tasks move through a fixed status machine; completion is gated on
//! subtasks and on the task's context, and finishing a task unblocks its
//! dependents. The module follows hexagonal architecture:
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
