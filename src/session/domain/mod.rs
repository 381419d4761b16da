//! Domain model for agent work sessions.

mod error;
mod ids;
mod session;
mod status;

pub use error::{ParseSessionStatusError, WorkSessionError};
pub use ids::WorkSessionId;
pub use session::{PersistedWorkSessionData, ProgressUpdate, WorkSession};
pub use status::SessionStatus;
