//! Agent work sessions.
//!
//! A session records one agent working one task: pause and resume
//! bookkeeping, resource locks and a progress timeline. Timeouts are not
//! scheduled; [`services::WorkSessionService::expire_overdue_sessions`] must
//! be polled by the embedder.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
