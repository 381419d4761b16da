//! Validation limits applied to task aggregates.

use serde::{Deserialize, Serialize};

/// Field limits enforced when tasks are created or edited.
///
/// The service layer defaults to a 2000-character description; API-facing
/// callers that want the tighter bound use [`TaskLimits::strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskLimits {
    /// Minimum title length in characters.
    pub min_title_length: usize,
    /// Maximum title length in characters.
    pub max_title_length: usize,
    /// Maximum description length in characters.
    pub max_description_length: usize,
    /// Maximum number of assignees.
    pub max_assignees: usize,
    /// Maximum number of labels.
    pub max_labels: usize,
    /// Maximum number of dependencies.
    pub max_dependencies: usize,
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            min_title_length: 3,
            max_title_length: 200,
            max_description_length: 2000,
            max_assignees: 5,
            max_labels: 10,
            max_dependencies: 10,
        }
    }
}

impl TaskLimits {
    /// Limits used at the request-validation layer.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_description_length: 1000,
            ..Self::default()
        }
    }
}
