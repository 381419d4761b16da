//! Tracing subscriber installation.
//!
//! The library only emits `tracing` events; embedders and tests call
//! [`init_tracing`] once to see them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_directive: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_owned(),
            json: false,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelemetryError {
    /// The configured directive does not parse.
    #[error("invalid tracing directive {directive:?}: {reason}")]
    InvalidDirective {
        /// Configured directive.
        directive: String,
        /// Parser explanation.
        reason: String,
    },

    /// A global subscriber is already set.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` overrides [`TelemetryConfig::default_directive`].
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] when the configured
/// directive is malformed and [`TelemetryError::AlreadyInstalled`] on every
/// call after the first successful one.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|_| TelemetryError::AlreadyInstalled)
}

fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.default_directive).map_err(|err| TelemetryError::InvalidDirective {
        directive: config.default_directive.clone(),
        reason: err.to_string(),
    })
}
