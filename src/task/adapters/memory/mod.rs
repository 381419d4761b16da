//! In-memory adapters for task lifecycle tests and embedded use.

mod events;
mod task;

pub use events::InMemoryTaskEventLog;
pub use task::{InMemorySubtaskRepository, InMemoryTaskRepository};
