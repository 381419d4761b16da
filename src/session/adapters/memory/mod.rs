//! In-memory adapter for work sessions.

mod session;

pub use session::InMemoryWorkSessionRepository;
