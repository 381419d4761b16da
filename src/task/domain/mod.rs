//! Domain model for tasks, subtasks and their lifecycle.
//!
//! Tasks own their subtasks and dependencies by identifier only, so the
//! aggregate never forms a cyclic object graph. Infrastructure concerns stay
//! outside this boundary.

mod error;
mod event;
mod ids;
mod limits;
mod status;
mod subtask;
mod task;

pub use error::{ParseTaskPriorityError, ParseTaskStatusError, TaskDomainError};
pub use event::{TaskEvent, TaskEventKind};
pub use ids::{BranchId, ProjectId, SubtaskId, TaskId};
pub use limits::TaskLimits;
pub use status::{TaskPriority, TaskStatus};
pub use subtask::{PersistedSubtaskData, Subtask};
pub use task::{PersistedTaskData, Task, TaskChanges, TaskDraft};
