//! Upward delegation requests and their review lifecycle.

use super::{
    ContextDomainError, ContextId, ContextLevel, ContextRef, DelegationId,
    ParseDelegationStatusError, ParseDelegationTriggerError,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Review state of a delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    /// Waiting in the review queue.
    Pending,
    /// Approved and merged into the target context.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
}

impl DelegationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DelegationStatus {
    type Error = ParseDelegationStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseDelegationStatusError(value.to_owned())),
        }
    }
}

/// What caused a delegation to be raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationTrigger {
    /// Requested explicitly by an agent or user.
    #[default]
    Manual,
    /// Raised because the payload matched a known pattern.
    AutoPattern,
    /// Raised because a confidence threshold was crossed.
    AutoThreshold,
}

impl DelegationTrigger {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoPattern => "auto_pattern",
            Self::AutoThreshold => "auto_threshold",
        }
    }
}

impl fmt::Display for DelegationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DelegationTrigger {
    type Error = ParseDelegationTriggerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "auto_pattern" => Ok(Self::AutoPattern),
            "auto_threshold" => Ok(Self::AutoThreshold),
            _ => Err(ParseDelegationTriggerError(value.to_owned())),
        }
    }
}

/// Request to promote data from one level to a broader one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRequest {
    /// Level the data comes from.
    pub source_level: ContextLevel,
    /// Context the data comes from.
    pub source_id: ContextId,
    /// Level the data should land in.
    pub target_level: ContextLevel,
    /// Explicit target; resolved from the source when absent.
    pub target_id: Option<ContextId>,
    /// Payload to merge into the target.
    pub delegated_data: Map<String, Value>,
    /// Free-form justification.
    pub reason: String,
    /// What raised the request.
    pub trigger: DelegationTrigger,
    /// Caller-supplied confidence; overrides pattern scoring when present.
    pub confidence_score: Option<f64>,
}

impl DelegationRequest {
    /// Creates a manual request with no explicit target or confidence.
    #[must_use]
    pub fn new(
        source_level: ContextLevel,
        source_id: ContextId,
        target_level: ContextLevel,
        delegated_data: Map<String, Value>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_level,
            source_id,
            target_level,
            target_id: None,
            delegated_data,
            reason: reason.into(),
            trigger: DelegationTrigger::Manual,
            confidence_score: None,
        }
    }

    /// Sets an explicit target context.
    #[must_use]
    pub const fn with_target_id(mut self, target_id: ContextId) -> Self {
        self.target_id = Some(target_id);
        self
    }

    /// Sets the trigger type.
    #[must_use]
    pub const fn with_trigger(mut self, trigger: DelegationTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Sets a caller-supplied confidence score.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = Some(confidence);
        self
    }

    /// Checks the structural rules every delegation must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError::DelegationNotUpward`] unless the target
    /// sits strictly above the source,
    /// [`ContextDomainError::EmptyDelegationData`] for an empty payload, and
    /// [`ContextDomainError::InvalidConfidence`] for a score outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ContextDomainError> {
        if !self.target_level.is_above(self.source_level) {
            return Err(ContextDomainError::DelegationNotUpward {
                from: self.source_level,
                to: self.target_level,
            });
        }
        if self.delegated_data.is_empty() {
            return Err(ContextDomainError::EmptyDelegationData);
        }
        if let Some(score) = self.confidence_score
            && !(0.0..=1.0).contains(&score)
        {
            return Err(ContextDomainError::InvalidConfidence(score));
        }
        Ok(())
    }
}

/// Routing decision produced by impact assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Safe to merge without review.
    AutoApprove,
    /// Needs an operator decision.
    ManualReview,
}

impl Recommendation {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoApprove => "auto_approve",
            Self::ManualReview => "manual_review",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored estimate of how safely a delegation can be merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    /// Final score in `[0, 1]`.
    pub score: f64,
    /// Confidence before level penalties.
    pub confidence: f64,
    /// Routing decision.
    pub recommendation: Recommendation,
    /// Names of the heuristics that matched the payload.
    pub matched_patterns: Vec<String>,
    /// Reasons that pushed the delegation towards review.
    pub risk_factors: Vec<String>,
}

impl ImpactAssessment {
    /// Returns `true` when the assessment recommends auto-approval.
    #[must_use]
    pub fn recommends_auto_approval(&self) -> bool {
        self.recommendation == Recommendation::AutoApprove
    }
}

/// Stored delegation with its review state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    id: DelegationId,
    source: ContextRef,
    target: ContextRef,
    delegated_data: Map<String, Value>,
    reason: String,
    trigger: DelegationTrigger,
    confidence_score: Option<f64>,
    impact: Option<ImpactAssessment>,
    status: DelegationStatus,
    auto_approved: bool,
    reviewed_by: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted delegation.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedDelegationData {
    /// Persisted identifier.
    pub id: DelegationId,
    /// Persisted source pointer.
    pub source: ContextRef,
    /// Persisted target pointer.
    pub target: ContextRef,
    /// Persisted payload.
    pub delegated_data: Map<String, Value>,
    /// Persisted justification.
    pub reason: String,
    /// Persisted trigger.
    pub trigger: DelegationTrigger,
    /// Persisted caller confidence.
    pub confidence_score: Option<f64>,
    /// Persisted assessment.
    pub impact: Option<ImpactAssessment>,
    /// Persisted status.
    pub status: DelegationStatus,
    /// Whether the approval was automatic.
    pub auto_approved: bool,
    /// Persisted reviewer.
    pub reviewed_by: Option<String>,
    /// Persisted rejection reason.
    pub rejection_reason: Option<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted review timestamp.
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Delegation {
    /// Records a validated request against its resolved target.
    #[must_use]
    pub fn new(request: DelegationRequest, target_id: ContextId, clock: &impl Clock) -> Self {
        Self {
            id: DelegationId::new(),
            source: ContextRef::new(request.source_level, request.source_id),
            target: ContextRef::new(request.target_level, target_id),
            delegated_data: request.delegated_data,
            reason: request.reason,
            trigger: request.trigger,
            confidence_score: request.confidence_score,
            impact: None,
            status: DelegationStatus::Pending,
            auto_approved: false,
            reviewed_by: None,
            rejection_reason: None,
            created_at: clock.utc(),
            reviewed_at: None,
        }
    }

    /// Reconstructs a delegation from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedDelegationData) -> Self {
        Self {
            id: data.id,
            source: data.source,
            target: data.target,
            delegated_data: data.delegated_data,
            reason: data.reason,
            trigger: data.trigger,
            confidence_score: data.confidence_score,
            impact: data.impact,
            status: data.status,
            auto_approved: data.auto_approved,
            reviewed_by: data.reviewed_by,
            rejection_reason: data.rejection_reason,
            created_at: data.created_at,
            reviewed_at: data.reviewed_at,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> DelegationId {
        self.id
    }

    /// Returns the source pointer.
    #[must_use]
    pub const fn source(&self) -> ContextRef {
        self.source
    }

    /// Returns the target pointer.
    #[must_use]
    pub const fn target(&self) -> ContextRef {
        self.target
    }

    /// Returns the payload.
    #[must_use]
    pub const fn delegated_data(&self) -> &Map<String, Value> {
        &self.delegated_data
    }

    /// Returns the justification.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the trigger type.
    #[must_use]
    pub const fn trigger(&self) -> DelegationTrigger {
        self.trigger
    }

    /// Returns the caller-supplied confidence.
    #[must_use]
    pub const fn confidence_score(&self) -> Option<f64> {
        self.confidence_score
    }

    /// Returns the recorded assessment.
    #[must_use]
    pub const fn impact(&self) -> Option<&ImpactAssessment> {
        self.impact.as_ref()
    }

    /// Returns the review status.
    #[must_use]
    pub const fn status(&self) -> DelegationStatus {
        self.status
    }

    /// Returns `true` when the approval did not involve a reviewer.
    #[must_use]
    pub const fn is_auto_approved(&self) -> bool {
        self.auto_approved
    }

    /// Returns the reviewer identifier.
    #[must_use]
    pub fn reviewed_by(&self) -> Option<&str> {
        self.reviewed_by.as_deref()
    }

    /// Returns the rejection reason.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the review timestamp.
    #[must_use]
    pub const fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    /// Attaches the impact assessment.
    pub fn record_impact(&mut self, impact: ImpactAssessment) {
        self.impact = Some(impact);
    }

    /// Approves the delegation on behalf of `reviewer`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError::EmptyReviewer`] for a blank reviewer and
    /// [`ContextDomainError::DelegationNotPending`] once reviewed.
    pub fn approve(
        &mut self,
        reviewer: &str,
        clock: &impl Clock,
    ) -> Result<(), ContextDomainError> {
        let reviewer_id = non_blank_reviewer(reviewer)?;
        self.ensure_pending()?;
        self.status = DelegationStatus::Approved;
        self.reviewed_by = Some(reviewer_id);
        self.reviewed_at = Some(clock.utc());
        Ok(())
    }

    /// Approves the delegation without a reviewer.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError::DelegationNotPending`] once reviewed.
    pub fn auto_approve(&mut self, clock: &impl Clock) -> Result<(), ContextDomainError> {
        self.ensure_pending()?;
        self.status = DelegationStatus::Approved;
        self.auto_approved = true;
        self.reviewed_at = Some(clock.utc());
        Ok(())
    }

    /// Rejects the delegation on behalf of `reviewer`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError::EmptyReviewer`] for a blank reviewer and
    /// [`ContextDomainError::DelegationNotPending`] once reviewed.
    pub fn reject(
        &mut self,
        reviewer: &str,
        reason: Option<&str>,
        clock: &impl Clock,
    ) -> Result<(), ContextDomainError> {
        let reviewer_id = non_blank_reviewer(reviewer)?;
        self.ensure_pending()?;
        self.status = DelegationStatus::Rejected;
        self.reviewed_by = Some(reviewer_id);
        self.rejection_reason = reason.map(str::to_owned);
        self.reviewed_at = Some(clock.utc());
        Ok(())
    }

    /// Returns an approved delegation to the review queue after its payload
    /// could not be applied. Rejected and pending delegations are unchanged.
    pub fn reopen(&mut self) {
        if self.status == DelegationStatus::Approved {
            self.status = DelegationStatus::Pending;
            self.auto_approved = false;
            self.reviewed_by = None;
            self.reviewed_at = None;
        }
    }

    const fn ensure_pending(&self) -> Result<(), ContextDomainError> {
        match self.status {
            DelegationStatus::Pending => Ok(()),
            status => Err(ContextDomainError::DelegationNotPending {
                id: self.id,
                status,
            }),
        }
    }
}

fn non_blank_reviewer(reviewer: &str) -> Result<String, ContextDomainError> {
    let trimmed = reviewer.trim();
    if trimmed.is_empty() {
        return Err(ContextDomainError::EmptyReviewer);
    }
    Ok(trimmed.to_owned())
}
