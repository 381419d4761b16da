//! Weighted progress scoring.
//!
//! A task's overall progress blends a status-derived score with the
//! completion ratio of its subtasks. Percentages are rounded to one decimal
//! place; the unit score is the rounded percentage divided by 100.

use crate::task::{
    domain::{Subtask, Task, TaskId, TaskStatus},
    ports::{SubtaskRepository, TaskRepositoryResult},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Weights blending the status score with subtask completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of the status-derived score.
    pub status_weight: f64,
    /// Weight of the subtask completion ratio.
    pub subtask_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            status_weight: 0.6,
            subtask_weight: 0.4,
        }
    }
}

/// Status-derived base score in `[0, 1]`.
#[must_use]
pub const fn status_score(status: TaskStatus) -> f64 {
    match status {
        TaskStatus::Todo | TaskStatus::Blocked | TaskStatus::Cancelled => 0.0,
        TaskStatus::InProgress => 0.5,
        TaskStatus::Review => 0.8,
        TaskStatus::Testing => 0.9,
        TaskStatus::Done => 1.0,
    }
}

/// Subtask counts for one parent task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtaskSummary {
    /// Number of subtasks.
    pub total: usize,
    /// Number of completed subtasks.
    pub completed: usize,
    /// Number of unfinished subtasks.
    pub incomplete: usize,
    /// Completed share as a percentage; 100 when there are no subtasks.
    pub completion_percentage: f64,
    /// Whether the subtasks allow the parent to complete.
    pub can_complete_parent: bool,
}

impl SubtaskSummary {
    /// Summarizes a list of subtasks.
    #[must_use]
    pub fn from_subtasks(subtasks: &[Subtask]) -> Self {
        let total = subtasks.len();
        let completed = subtasks
            .iter()
            .filter(|subtask| subtask.is_completed())
            .count();
        let incomplete = total.saturating_sub(completed);
        Self {
            total,
            completed,
            incomplete,
            completion_percentage: round_to_tenth(completion_percentage(completed, total)),
            can_complete_parent: incomplete == 0,
        }
    }
}

/// Structured progress report for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskProgressReport {
    /// Task the report describes.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Status-derived base score in `[0, 1]`.
    pub status_score: f64,
    /// Subtask counts.
    pub subtasks: SubtaskSummary,
    /// Weighted progress in `[0, 100]`.
    pub overall_percentage: f64,
    /// Whether nothing blocks completion.
    pub can_complete: bool,
    /// Human-readable reasons completion is blocked.
    pub blocking_factors: Vec<String>,
}

/// Computes progress scores from status and subtask state.
#[derive(Clone)]
pub struct ProgressScoringService<S>
where
    S: SubtaskRepository,
{
    subtasks: Arc<S>,
    weights: ScoringWeights,
}

impl<S> ProgressScoringService<S>
where
    S: SubtaskRepository,
{
    /// Creates a scoring service with the default weights.
    #[must_use]
    pub fn new(subtasks: Arc<S>) -> Self {
        Self::with_weights(subtasks, ScoringWeights::default())
    }

    /// Creates a scoring service with custom weights.
    #[must_use]
    pub const fn with_weights(subtasks: Arc<S>, weights: ScoringWeights) -> Self {
        Self { subtasks, weights }
    }

    /// Returns the weighted progress score in `[0, 1]`.
    ///
    /// Falls back to `0.0` when the subtasks cannot be loaded.
    pub async fn calculate_progress_score(&self, task: &Task) -> f64 {
        match self.load_subtasks(task).await {
            Ok(subtasks) => {
                let summary = SubtaskSummary::from_subtasks(&subtasks);
                percentage_to_score(self.overall_percentage(task.status(), &summary))
            }
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "progress score fell back to zero");
                0.0
            }
        }
    }

    /// Builds the full progress report for `task`.
    ///
    /// Never fails: a lookup error yields `can_complete = false` with an
    /// error-tagged blocking factor.
    pub async fn calculate_task_progress(&self, task: &Task) -> TaskProgressReport {
        let status = task.status();
        let base = status_score(status);
        match self.load_subtasks(task).await {
            Ok(subtasks) => {
                let summary = SubtaskSummary::from_subtasks(&subtasks);
                let mut blocking_factors = Vec::new();
                if summary.incomplete > 0 {
                    blocking_factors.push(format!(
                        "{} of {} subtasks incomplete",
                        summary.incomplete, summary.total
                    ));
                }
                if status == TaskStatus::Blocked {
                    blocking_factors.push("Task status is blocked".to_owned());
                }
                TaskProgressReport {
                    task_id: task.id(),
                    status,
                    status_score: base,
                    overall_percentage: self.overall_percentage(status, &summary),
                    can_complete: summary.incomplete == 0 && status != TaskStatus::Blocked,
                    subtasks: summary,
                    blocking_factors,
                }
            }
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "progress calculation failed");
                TaskProgressReport {
                    task_id: task.id(),
                    status,
                    status_score: base,
                    subtasks: SubtaskSummary::from_subtasks(&[]),
                    overall_percentage: 0.0,
                    can_complete: false,
                    blocking_factors: vec![format!("error: {err}")],
                }
            }
        }
    }

    async fn load_subtasks(&self, task: &Task) -> TaskRepositoryResult<Vec<Subtask>> {
        self.subtasks.find_by_parent_task_id(task.id()).await
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "weighted scoring is defined over floating-point weights"
    )]
    fn overall_percentage(&self, status: TaskStatus, summary: &SubtaskSummary) -> f64 {
        let weighted = status_score(status) * 100.0 * self.weights.status_weight
            + summary.completion_percentage * self.weights.subtask_weight;
        round_to_tenth(weighted.clamp(0.0, 100.0))
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "a ratio of counts is inherently fractional"
)]
fn completion_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let done = f64::from(u32::try_from(completed).unwrap_or(u32::MAX));
    let all = f64::from(u32::try_from(total).unwrap_or(u32::MAX));
    done / all * 100.0
}

#[expect(clippy::float_arithmetic, reason = "decimal rounding")]
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[expect(clippy::float_arithmetic, reason = "percentage to unit interval")]
fn percentage_to_score(percentage: f64) -> f64 {
    (percentage / 100.0).clamp(0.0, 1.0)
}
