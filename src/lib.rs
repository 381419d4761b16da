//! Stratum: hierarchical context, delegation and task completion engine.
//!
//! The crate tracks tasks through a fixed status machine, scores their
//! progress, resolves dependents when work finishes, and manages a
//! four-level context hierarchy (global, project, branch, task) whose data
//! inherits downward while insights are delegated upward.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for persistence and events
//! - **Adapters**: In-memory and `PostgreSQL` implementations of ports
//! - **Services**: Use-case orchestration over the ports
//!
//! # Modules
//!
//! - [`task`]: Tasks, subtasks, status transitions, scoring and completion
//! - [`context`]: Context hierarchy and upward delegation
//! - [`session`]: Agent work sessions
//! - [`config`]: Typed engine configuration
//! - [`service_context`]: Service container over a chosen backend
//! - [`telemetry`]: Tracing subscriber installation

pub mod config;
pub mod context;
pub mod service_context;
pub mod session;
pub mod task;
pub mod telemetry;

#[cfg(test)]
mod test_support;
