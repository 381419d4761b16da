//! Heuristics that score how safely a delegation can be merged unreviewed.
//!
//! The payload's keys and string values are scanned for pattern keywords.
//! The best matching pattern sets the base confidence, quality keywords add
//! boosts, and the target level subtracts a penalty. Every constant lives in
//! [`DelegationConfig`].

use crate::context::domain::{
    ContextId, ContextLevel, DelegationRequest, ImpactAssessment, Recommendation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Tunables for delegation scoring and the review queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationConfig {
    /// Minimum impact score for auto-approval.
    pub auto_approve_threshold: f64,
    /// Pending queue size above which the queue reports unhealthy.
    pub max_pending_delegations: usize,
    /// Project used when a task source has no recorded project.
    pub default_project_id: Option<ContextId>,
    /// Base confidence of [`DelegationPattern::SecurityDiscovery`].
    pub security_discovery_confidence: f64,
    /// Base confidence of [`DelegationPattern::TeamImprovement`].
    pub team_improvement_confidence: f64,
    /// Base confidence of [`DelegationPattern::ReusableUtility`].
    pub reusable_utility_confidence: f64,
    /// Confidence used when no pattern matches.
    pub default_confidence: f64,
    /// Boost when the payload mentions testing.
    pub tested_boost: f64,
    /// Boost when the payload mentions documentation.
    pub documented_boost: f64,
    /// Boost when the payload mentions validation.
    pub validated_boost: f64,
    /// Penalty for delegating into the global context.
    pub global_penalty: f64,
    /// Penalty for delegating into a project context.
    pub project_penalty: f64,
    /// Penalty for delegating into a branch context.
    pub branch_penalty: f64,
    /// Payloads with more top-level keys always go to manual review.
    pub max_auto_approve_keys: usize,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            auto_approve_threshold: 0.8,
            max_pending_delegations: 100,
            default_project_id: None,
            security_discovery_confidence: 0.9,
            team_improvement_confidence: 0.7,
            reusable_utility_confidence: 0.8,
            default_confidence: 0.5,
            tested_boost: 0.1,
            documented_boost: 0.05,
            validated_boost: 0.05,
            global_penalty: 0.1,
            project_penalty: 0.05,
            branch_penalty: 0.0,
            max_auto_approve_keys: 20,
        }
    }
}

impl DelegationConfig {
    /// Base confidence contributed by `pattern`.
    #[must_use]
    pub const fn base_confidence(&self, pattern: DelegationPattern) -> f64 {
        match pattern {
            DelegationPattern::SecurityDiscovery => self.security_discovery_confidence,
            DelegationPattern::TeamImprovement => self.team_improvement_confidence,
            DelegationPattern::ReusableUtility => self.reusable_utility_confidence,
        }
    }

    /// Boost contributed by `indicator`.
    #[must_use]
    pub const fn quality_boost(&self, indicator: QualityIndicator) -> f64 {
        match indicator {
            QualityIndicator::Tested => self.tested_boost,
            QualityIndicator::Documented => self.documented_boost,
            QualityIndicator::Validated => self.validated_boost,
        }
    }

    /// Penalty applied when delegating into `level`.
    #[must_use]
    pub const fn level_penalty(&self, level: ContextLevel) -> f64 {
        match level {
            ContextLevel::Global => self.global_penalty,
            ContextLevel::Project => self.project_penalty,
            ContextLevel::Branch => self.branch_penalty,
            ContextLevel::Task => 0.0,
        }
    }
}

/// Named heuristic recognised in delegated payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationPattern {
    /// Security findings worth sharing widely.
    SecurityDiscovery,
    /// Process or convention improvements for the team.
    TeamImprovement,
    /// Helpers and components that other work can reuse.
    ReusableUtility,
}

impl DelegationPattern {
    /// Every pattern.
    pub const ALL: [Self; 3] = [
        Self::SecurityDiscovery,
        Self::TeamImprovement,
        Self::ReusableUtility,
    ];

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SecurityDiscovery => "security_discovery",
            Self::TeamImprovement => "team_improvement",
            Self::ReusableUtility => "reusable_utility",
        }
    }

    /// Lowercase keywords whose presence signals this pattern.
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::SecurityDiscovery => &[
                "security",
                "vulnerability",
                "exploit",
                "cve",
                "injection",
                "xss",
                "authentication",
            ],
            Self::TeamImprovement => &[
                "workflow",
                "process",
                "convention",
                "best_practice",
                "best practice",
                "team",
            ],
            Self::ReusableUtility => &[
                "utility",
                "helper",
                "reusable",
                "shared",
                "library",
                "component",
            ],
        }
    }
}

impl fmt::Display for DelegationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword that raises confidence in a matched pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityIndicator {
    /// Mentions tests.
    Tested,
    /// Mentions documentation.
    Documented,
    /// Mentions validation.
    Validated,
}

impl QualityIndicator {
    /// Every indicator.
    pub const ALL: [Self; 3] = [Self::Tested, Self::Documented, Self::Validated];

    /// Keyword searched for in the payload.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Tested => "tested",
            Self::Documented => "documented",
            Self::Validated => "validated",
        }
    }
}

/// Lowercased text of a payload's keys and scalar values.
#[must_use]
pub fn payload_text(data: &Map<String, Value>) -> String {
    let mut text = String::new();
    collect_object(data, &mut text);
    text
}

fn collect_object(data: &Map<String, Value>, text: &mut String) {
    for (key, value) in data {
        text.push_str(&key.to_lowercase());
        text.push(' ');
        collect_value(value, text);
    }
}

fn collect_value(value: &Value, text: &mut String) {
    match value {
        Value::Object(nested) => collect_object(nested, text),
        Value::Array(items) => items.iter().for_each(|item| collect_value(item, text)),
        Value::String(content) => {
            text.push_str(&content.to_lowercase());
            text.push(' ');
        }
        Value::Bool(_) | Value::Number(_) | Value::Null => {}
    }
}

/// Returns `true` when `text` contains any keyword of `pattern`.
#[must_use]
pub fn matches_pattern(pattern: DelegationPattern, text: &str) -> bool {
    pattern
        .keywords()
        .iter()
        .any(|keyword| text.contains(keyword))
}

/// Patterns matched by a payload, in [`DelegationPattern::ALL`] order.
#[must_use]
pub fn matched_patterns(data: &Map<String, Value>) -> Vec<DelegationPattern> {
    let text = payload_text(data);
    DelegationPattern::ALL
        .into_iter()
        .filter(|pattern| matches_pattern(*pattern, &text))
        .collect()
}

/// Confidence derived from pattern matches and quality keywords, in `[0, 1]`.
///
/// Without any pattern match the configured default applies and quality
/// keywords are ignored.
#[must_use]
pub fn pattern_confidence(config: &DelegationConfig, data: &Map<String, Value>) -> f64 {
    let text = payload_text(data);
    let best = DelegationPattern::ALL
        .into_iter()
        .filter(|pattern| matches_pattern(*pattern, &text))
        .map(|pattern| config.base_confidence(pattern))
        .reduce(f64::max);
    best.map_or(config.default_confidence, |base| {
        let boosts = QualityIndicator::ALL
            .into_iter()
            .filter(|indicator| text.contains(indicator.keyword()))
            .map(|indicator| config.quality_boost(indicator));
        sum_clamped(base, boosts)
    })
}

/// Scores a validated request and recommends a route.
#[must_use]
pub fn assess_impact(config: &DelegationConfig, request: &DelegationRequest) -> ImpactAssessment {
    let patterns = matched_patterns(&request.delegated_data);
    let confidence = request
        .confidence_score
        .unwrap_or_else(|| pattern_confidence(config, &request.delegated_data));
    let score = subtract_clamped(confidence, config.level_penalty(request.target_level));

    let mut risk_factors = Vec::new();
    let key_count = request.delegated_data.len();
    if key_count > config.max_auto_approve_keys {
        risk_factors.push(format!(
            "payload has {key_count} top-level keys (limit {})",
            config.max_auto_approve_keys
        ));
    }
    if score < config.auto_approve_threshold {
        risk_factors.push(format!(
            "impact score {score:.2} below threshold {:.2}",
            config.auto_approve_threshold
        ));
    }
    let recommendation = if risk_factors.is_empty() {
        Recommendation::AutoApprove
    } else {
        Recommendation::ManualReview
    };

    ImpactAssessment {
        score,
        confidence,
        recommendation,
        matched_patterns: patterns
            .into_iter()
            .map(|pattern| pattern.as_str().to_owned())
            .collect(),
        risk_factors,
    }
}

/// Returns `true` when `impact` clears the threshold and carries no risk
/// factors.
#[must_use]
pub fn should_auto_approve(config: &DelegationConfig, impact: &ImpactAssessment) -> bool {
    impact.recommends_auto_approval() && impact.score >= config.auto_approve_threshold
}

#[expect(clippy::float_arithmetic, reason = "confidence boosts are additive")]
fn sum_clamped(base: f64, boosts: impl Iterator<Item = f64>) -> f64 {
    boosts.fold(base, |total, boost| total + boost).clamp(0.0, 1.0)
}

#[expect(clippy::float_arithmetic, reason = "level penalties are subtractive")]
fn subtract_clamped(value: f64, penalty: f64) -> f64 {
    (value - penalty).clamp(0.0, 1.0)
}
