//! Engine configuration.
//!
//! Every tunable constant of the engine lives here with its production
//! default. Each section is `#[serde(default)]`, so a JSON document only
//! needs the keys it overrides.

use crate::context::services::DelegationConfig;
use crate::task::domain::TaskLimits;
use crate::task::services::{CompletionPolicy, ScoringWeights};
use crate::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Allowed drift of the scoring weights from a sum of 1.0.
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Aggregated engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Task field limits.
    pub limits: TaskLimits,
    /// Progress scoring weights.
    pub scoring: ScoringWeights,
    /// Delegation scoring and queue tunables.
    pub delegation: DelegationConfig,
    /// Task completion preconditions.
    pub completion: CompletionPolicy,
    /// Tracing subscriber settings.
    pub telemetry: TelemetryConfig,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        /// File that failed to load.
        path: String,
        /// Underlying I/O error.
        source: Arc<std::io::Error>,
    },

    /// The document is not valid configuration JSON.
    #[error("invalid configuration document: {0}")]
    Parse(Arc<serde_json::Error>),

    /// The scoring weights do not sum to 1.0.
    #[error("scoring weights must sum to 1.0, got {status_weight} + {subtask_weight}")]
    WeightSum {
        /// Configured status weight.
        status_weight: f64,
        /// Configured subtask weight.
        subtask_weight: f64,
    },

    /// A ratio lies outside `[0, 1]`.
    #[error("{field} must lie within [0, 1], got {value}")]
    OutOfRange {
        /// Offending field.
        field: &'static str,
        /// Configured value.
        value: f64,
    },

    /// The title bounds are inverted.
    #[error("minimum title length {min} exceeds maximum {max}")]
    TitleBounds {
        /// Configured minimum.
        min: usize,
        /// Configured maximum.
        max: usize,
    },
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation
    /// error from [`EngineConfig::validate`].
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|err| ConfigError::Parse(Arc::new(err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// as [`EngineConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = path.as_ref();
        let document = std::fs::read_to_string(file).map_err(|err| ConfigError::Io {
            path: file.display().to_string(),
            source: Arc::new(err),
        })?;
        Self::from_json_str(&document)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WeightSum`] when the scoring weights do not
    /// sum to 1.0, [`ConfigError::OutOfRange`] for a ratio outside `[0, 1]`,
    /// and [`ConfigError::TitleBounds`] for inverted title limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.min_title_length > self.limits.max_title_length {
            return Err(ConfigError::TitleBounds {
                min: self.limits.min_title_length,
                max: self.limits.max_title_length,
            });
        }

        ensure_unit("scoring.status_weight", self.scoring.status_weight)?;
        ensure_unit("scoring.subtask_weight", self.scoring.subtask_weight)?;
        if !weights_sum_to_one(self.scoring) {
            return Err(ConfigError::WeightSum {
                status_weight: self.scoring.status_weight,
                subtask_weight: self.scoring.subtask_weight,
            });
        }

        let delegation = &self.delegation;
        for (field, value) in [
            ("delegation.auto_approve_threshold", delegation.auto_approve_threshold),
            (
                "delegation.security_discovery_confidence",
                delegation.security_discovery_confidence,
            ),
            (
                "delegation.team_improvement_confidence",
                delegation.team_improvement_confidence,
            ),
            (
                "delegation.reusable_utility_confidence",
                delegation.reusable_utility_confidence,
            ),
            ("delegation.default_confidence", delegation.default_confidence),
            ("delegation.tested_boost", delegation.tested_boost),
            ("delegation.documented_boost", delegation.documented_boost),
            ("delegation.validated_boost", delegation.validated_boost),
            ("delegation.global_penalty", delegation.global_penalty),
            ("delegation.project_penalty", delegation.project_penalty),
            ("delegation.branch_penalty", delegation.branch_penalty),
        ] {
            ensure_unit(field, value)?;
        }
        Ok(())
    }
}

fn ensure_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "the weight sum is compared against a tolerance"
)]
fn weights_sum_to_one(weights: ScoringWeights) -> bool {
    (weights.status_weight + weights.subtask_weight - 1.0).abs() <= WEIGHT_TOLERANCE
}
