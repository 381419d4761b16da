//! Application services for work sessions.

mod work;

pub use work::{WorkSessionService, WorkSessionServiceError, WorkSessionServiceResult};
