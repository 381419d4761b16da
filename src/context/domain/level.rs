//! Context hierarchy levels.

use super::ParseContextLevelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four nesting levels, broadest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLevel {
    /// Organisation-wide settings.
    Global,
    /// Project-wide settings.
    Project,
    /// Branch (task tree) settings.
    Branch,
    /// Single task settings.
    Task,
}

impl ContextLevel {
    /// Every level, broadest first.
    pub const ALL: [Self; 4] = [Self::Global, Self::Project, Self::Branch, Self::Task];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
            Self::Branch => "branch",
            Self::Task => "task",
        }
    }

    /// Depth in the hierarchy; `global` is 0.
    #[must_use]
    pub const fn depth(self) -> u8 {
        match self {
            Self::Global => 0,
            Self::Project => 1,
            Self::Branch => 2,
            Self::Task => 3,
        }
    }

    /// Returns `true` when `self` is strictly broader than `other`.
    #[must_use]
    pub const fn is_above(self, other: Self) -> bool {
        self.depth() < other.depth()
    }

    /// The default parent level used when none is given explicitly.
    #[must_use]
    pub const fn default_parent(self) -> Option<Self> {
        match self {
            Self::Global => None,
            Self::Project => Some(Self::Global),
            Self::Branch => Some(Self::Project),
            Self::Task => Some(Self::Branch),
        }
    }
}

impl fmt::Display for ContextLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ContextLevel {
    type Error = ParseContextLevelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "global" => Ok(Self::Global),
            "project" => Ok(Self::Project),
            "branch" => Ok(Self::Branch),
            "task" => Ok(Self::Task),
            _ => Err(ParseContextLevelError(value.to_owned())),
        }
    }
}
