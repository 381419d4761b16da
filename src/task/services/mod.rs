//! Application services for task lifecycle orchestration.

mod completion;
mod dependency;
mod lifecycle;
mod progress;
mod transition;

pub use completion::{
    CompleteTaskRequest, CompletionBlocker, CompletionCheck, CompletionOutcome, CompletionPolicy,
    TaskCompletionService,
};
pub use dependency::{
    DependencyResolution, DependencyResolutionService, DependencyUpdate, detect_cycle,
};
pub use lifecycle::{TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService};
pub use progress::{
    ProgressScoringService, ScoringWeights, SubtaskSummary, TaskProgressReport, status_score,
};
pub use transition::{StatusTransitionService, TransitionCheck, TransitionHint, TransitionOutcome};
