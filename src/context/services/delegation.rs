//! Upward delegation: validation, scoring, review queue and execution.
//!
//! Every public operation returns a [`DelegationResult`] or [`QueueHealth`]
//! instead of an error, so callers always receive a structured answer.
//! Status changes go through the repository's compare-and-set, which means a
//! delegation is applied at most once even when reviewers race. The target
//! context is prepared before a delegation is approved, and an approval whose
//! merge fails is returned to the review queue.

use super::hierarchy::{ContextHierarchyService, ContextServiceError, ContextUpdate};
use super::patterns::{self, DelegationConfig};
use crate::context::{
    domain::{
        ContextDomainError, ContextId, ContextLevel, ContextRef, Delegation, DelegationId,
        DelegationRequest, DelegationStatus, ImpactAssessment, ParseContextLevelError,
    },
    ports::{
        ContextRepository, ContextRepositoryError, DelegationRepository,
        DelegationRepositoryError,
    },
};
use crate::task::{
    domain::TaskId,
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors raised inside the delegation service before they are folded into
/// a [`DelegationResult`].
#[derive(Debug, Clone, Error)]
pub enum DelegationServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ContextDomainError),

    /// A level string could not be parsed.
    #[error(transparent)]
    InvalidLevel(#[from] ParseContextLevelError),

    /// Hierarchy operation failed.
    #[error(transparent)]
    Hierarchy(#[from] ContextServiceError),

    /// Context lookup failed.
    #[error(transparent)]
    Contexts(#[from] ContextRepositoryError),

    /// Delegation storage failed or a concurrent review won.
    #[error(transparent)]
    Delegations(#[from] DelegationRepositoryError),

    /// Task lookup failed.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),

    /// No target context could be derived from the source.
    #[error("cannot resolve {target_level} target for {origin}")]
    UnresolvedTarget {
        /// Source of the delegation.
        origin: ContextRef,
        /// Level that needed resolving.
        target_level: ContextLevel,
    },

    /// The delegation does not exist.
    #[error("delegation not found: {0}")]
    NotFound(DelegationId),
}

/// Structured answer of every delegation operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelegationResult {
    /// Whether the operation did what was asked.
    pub success: bool,
    /// Delegation the result refers to.
    pub delegation_id: Option<DelegationId>,
    /// Review status after the operation.
    pub status: Option<DelegationStatus>,
    /// Whether the payload was merged into the target.
    pub processed: bool,
    /// Whether the delegation is approved.
    pub approved: bool,
    /// Whether approval happened without a reviewer.
    pub auto_approved: bool,
    /// Resolved target context.
    pub target: Option<ContextRef>,
    /// Impact assessment, once computed.
    pub impact: Option<ImpactAssessment>,
    /// Human-readable summary.
    pub message: String,
    /// Error text on failure.
    pub error: Option<String>,
}

impl DelegationResult {
    fn from_delegation(
        delegation: &Delegation,
        processed: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            delegation_id: Some(delegation.id()),
            status: Some(delegation.status()),
            processed,
            approved: delegation.status() == DelegationStatus::Approved,
            auto_approved: delegation.is_auto_approved(),
            target: Some(delegation.target()),
            impact: delegation.impact().cloned(),
            message: message.into(),
            error: None,
        }
    }

    fn not_applied(delegation: &Delegation, err: &DelegationServiceError) -> Self {
        let message = if delegation.status() == DelegationStatus::Pending {
            format!("Delegation could not be applied and awaits review: {err}")
        } else {
            format!("Delegation approved but could not be applied: {err}")
        };
        Self {
            success: false,
            error: Some(err.to_string()),
            ..Self::from_delegation(delegation, false, message)
        }
    }

    fn failure(err: &DelegationServiceError) -> Self {
        let text = err.to_string();
        Self {
            success: false,
            delegation_id: None,
            status: None,
            processed: false,
            approved: false,
            auto_approved: false,
            target: None,
            impact: None,
            message: text.clone(),
            error: Some(text),
        }
    }

    const fn with_delegation_id(mut self, id: DelegationId) -> Self {
        self.delegation_id = Some(id);
        self
    }
}

/// Coarse state of the review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Pending count within bounds.
    Healthy,
    /// Pending count above bounds.
    Unhealthy,
    /// The pending count could not be read.
    Unknown,
}

/// Review queue health snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueHealth {
    /// Overall status.
    pub status: QueueStatus,
    /// Pending delegations, when readable.
    pub pending_count: Option<usize>,
    /// Configured bound.
    pub max_pending: usize,
    /// Human-readable summary.
    pub message: String,
}

/// Processes delegation requests and operator reviews.
#[derive(Clone)]
pub struct ContextDelegationService<R, D, T, C>
where
    R: ContextRepository,
    D: DelegationRepository,
    T: TaskRepository,
    C: Clock + Send + Sync,
{
    contexts: Arc<R>,
    delegations: Arc<D>,
    tasks: Arc<T>,
    clock: Arc<C>,
    hierarchy: ContextHierarchyService<R, C>,
    config: DelegationConfig,
}

impl<R, D, T, C> ContextDelegationService<R, D, T, C>
where
    R: ContextRepository,
    D: DelegationRepository,
    T: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a delegation service with the default configuration.
    #[must_use]
    pub fn new(contexts: Arc<R>, delegations: Arc<D>, tasks: Arc<T>, clock: Arc<C>) -> Self {
        let hierarchy = ContextHierarchyService::new(Arc::clone(&contexts), Arc::clone(&clock));
        Self {
            contexts,
            delegations,
            tasks,
            clock,
            hierarchy,
            config: DelegationConfig::default(),
        }
    }

    /// Replaces the scoring and queue configuration.
    #[must_use]
    pub fn with_config(mut self, config: DelegationConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &DelegationConfig {
        &self.config
    }

    /// Validates, records and routes a delegation request.
    ///
    /// Requests whose impact clears the threshold are approved and merged
    /// into the target immediately; the rest wait for an operator.
    pub async fn process_delegation(&self, request: DelegationRequest) -> DelegationResult {
        let source = ContextRef::new(request.source_level, request.source_id);
        match self.try_process(request).await {
            Ok(result) => result,
            Err(err) => {
                warn!(source = %source, error = %err, "delegation rejected");
                DelegationResult::failure(&err)
            }
        }
    }

    /// Parses level names and then behaves like
    /// [`ContextDelegationService::process_delegation`].
    pub async fn process_delegation_str(
        &self,
        source_level: &str,
        source_id: ContextId,
        target_level: &str,
        target_id: Option<ContextId>,
        delegated_data: Map<String, Value>,
        reason: &str,
    ) -> DelegationResult {
        let levels = ContextLevel::try_from(source_level)
            .and_then(|source| ContextLevel::try_from(target_level).map(|target| (source, target)));
        match levels {
            Ok((source, target)) => {
                let request =
                    DelegationRequest::new(source, source_id, target, delegated_data, reason);
                let with_target = match target_id {
                    Some(id) => request.with_target_id(id),
                    None => request,
                };
                self.process_delegation(with_target).await
            }
            Err(err) => {
                warn!(error = %err, "delegation rejected");
                DelegationResult::failure(&DelegationServiceError::from(err))
            }
        }
    }

    /// Scores a request without recording it.
    #[must_use]
    pub fn assess_impact(&self, request: &DelegationRequest) -> ImpactAssessment {
        patterns::assess_impact(&self.config, request)
    }

    /// Returns `true` when `impact` permits auto-approval.
    #[must_use]
    pub fn should_auto_approve(&self, impact: &ImpactAssessment) -> bool {
        patterns::should_auto_approve(&self.config, impact)
    }

    /// Determines which context a request targets.
    ///
    /// `global` always maps to the singleton. Otherwise an explicit target
    /// wins; a task source then consults the task's recorded project or
    /// branch, then the source's context ancestry, and finally, for project
    /// targets, the configured default project.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationServiceError::UnresolvedTarget`] when none of
    /// these yields an identifier, or a lookup error.
    pub async fn resolve_target_id(
        &self,
        request: &DelegationRequest,
    ) -> Result<ContextId, DelegationServiceError> {
        if request.target_level == ContextLevel::Global {
            return Ok(ContextId::GLOBAL);
        }
        if let Some(explicit) = request.target_id {
            return Ok(explicit);
        }
        self.resolve_ancestor(
            ContextRef::new(request.source_level, request.source_id),
            request.target_level,
        )
        .await
    }

    /// Approves a pending delegation and merges it into its target.
    pub async fn approve_delegation(&self, id: DelegationId, operator: &str) -> DelegationResult {
        match self.try_approve(id, operator).await {
            Ok(result) => result,
            Err(err) => {
                warn!(delegation_id = %id, operator, error = %err, "delegation approval failed");
                DelegationResult::failure(&err).with_delegation_id(id)
            }
        }
    }

    /// Rejects a pending delegation.
    pub async fn reject_delegation(
        &self,
        id: DelegationId,
        operator: &str,
        reason: Option<&str>,
    ) -> DelegationResult {
        match self.try_reject(id, operator, reason).await {
            Ok(result) => result,
            Err(err) => {
                warn!(delegation_id = %id, operator, error = %err, "delegation rejection failed");
                DelegationResult::failure(&err).with_delegation_id(id)
            }
        }
    }

    /// Returns up to `limit` pending delegations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationServiceError::Delegations`] when storage fails.
    pub async fn list_pending(
        &self,
        limit: usize,
    ) -> Result<Vec<Delegation>, DelegationServiceError> {
        Ok(self.delegations.find_pending(limit).await?)
    }

    /// Loads a delegation by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationServiceError::Delegations`] when storage fails.
    pub async fn find_delegation(
        &self,
        id: DelegationId,
    ) -> Result<Option<Delegation>, DelegationServiceError> {
        Ok(self.delegations.find_by_id(id).await?)
    }

    /// Reports whether the review queue is within its configured bound.
    pub async fn queue_health(&self) -> QueueHealth {
        let max_pending = self.config.max_pending_delegations;
        match self.delegations.count_pending().await {
            Ok(count) if count <= max_pending => QueueHealth {
                status: QueueStatus::Healthy,
                pending_count: Some(count),
                max_pending,
                message: format!("{count} delegations pending"),
            },
            Ok(count) => {
                warn!(pending = count, max_pending, "delegation queue over capacity");
                QueueHealth {
                    status: QueueStatus::Unhealthy,
                    pending_count: Some(count),
                    max_pending,
                    message: format!("{count} delegations pending, exceeds limit of {max_pending}"),
                }
            }
            Err(err) => {
                error!(error = %err, "delegation queue health unavailable");
                QueueHealth {
                    status: QueueStatus::Unknown,
                    pending_count: None,
                    max_pending,
                    message: format!("queue health unavailable: {err}"),
                }
            }
        }
    }

    async fn try_process(
        &self,
        request: DelegationRequest,
    ) -> Result<DelegationResult, DelegationServiceError> {
        request.validate()?;
        let target_id = self.resolve_target_id(&request).await?;
        let impact = self.assess_impact(&request);
        let auto = self.should_auto_approve(&impact);

        let mut delegation = Delegation::new(request, target_id, &*self.clock);
        delegation.record_impact(impact);
        self.delegations.store(&delegation).await?;

        if !auto {
            info!(
                delegation_id = %delegation.id(),
                target = %delegation.target(),
                "delegation queued for manual review"
            );
            return Ok(DelegationResult::from_delegation(
                &delegation,
                false,
                "Delegation queued for manual review",
            ));
        }

        if let Err(err) = self.ensure_target(&delegation).await {
            warn!(
                delegation_id = %delegation.id(),
                target = %delegation.target(),
                error = %err,
                "target context unavailable; delegation left for review"
            );
            return Ok(DelegationResult::not_applied(&delegation, &err));
        }
        delegation.auto_approve(&*self.clock)?;
        self.delegations
            .update(&delegation, DelegationStatus::Pending)
            .await?;
        Ok(self.apply(&delegation, "Delegation auto-approved and applied").await)
    }

    async fn try_approve(
        &self,
        id: DelegationId,
        operator: &str,
    ) -> Result<DelegationResult, DelegationServiceError> {
        let pending = self.load(id).await?;
        let mut delegation = pending.clone();
        delegation.approve(operator, &*self.clock)?;
        if let Err(err) = self.ensure_target(&delegation).await {
            warn!(
                delegation_id = %id,
                target = %delegation.target(),
                error = %err,
                "target context unavailable; delegation left pending"
            );
            return Ok(DelegationResult::not_applied(&pending, &err));
        }
        self.delegations
            .update(&delegation, DelegationStatus::Pending)
            .await?;
        Ok(self.apply(&delegation, "Delegation approved and applied").await)
    }

    async fn try_reject(
        &self,
        id: DelegationId,
        operator: &str,
        reason: Option<&str>,
    ) -> Result<DelegationResult, DelegationServiceError> {
        let mut delegation = self.load(id).await?;
        delegation.reject(operator, reason, &*self.clock)?;
        self.delegations
            .update(&delegation, DelegationStatus::Pending)
            .await?;
        info!(delegation_id = %id, operator, "delegation rejected by reviewer");
        Ok(DelegationResult::from_delegation(
            &delegation,
            false,
            "Delegation rejected",
        ))
    }

    async fn load(&self, id: DelegationId) -> Result<Delegation, DelegationServiceError> {
        self.delegations
            .find_by_id(id)
            .await?
            .ok_or(DelegationServiceError::NotFound(id))
    }

    async fn apply(&self, delegation: &Delegation, message: &str) -> DelegationResult {
        match self.execute(delegation).await {
            Ok(update) => {
                info!(
                    delegation_id = %delegation.id(),
                    target = %delegation.target(),
                    version = update.context.version(),
                    auto_approved = delegation.is_auto_approved(),
                    "delegation applied"
                );
                DelegationResult::from_delegation(delegation, true, message)
            }
            Err(err) => {
                error!(
                    delegation_id = %delegation.id(),
                    target = %delegation.target(),
                    error = %err,
                    "approved delegation could not be applied"
                );
                let mut reopened = delegation.clone();
                reopened.reopen();
                if let Err(revert) = self
                    .delegations
                    .update(&reopened, DelegationStatus::Approved)
                    .await
                {
                    error!(
                        delegation_id = %delegation.id(),
                        error = %revert,
                        "unapplied delegation could not be returned to review"
                    );
                    return DelegationResult::not_applied(delegation, &err);
                }
                DelegationResult::not_applied(&reopened, &err)
            }
        }
    }

    async fn execute(
        &self,
        delegation: &Delegation,
    ) -> Result<ContextUpdate, DelegationServiceError> {
        let target = delegation.target();
        Ok(self
            .hierarchy
            .update_context(target.level, target.id, delegation.delegated_data(), false)
            .await?)
    }

    async fn ensure_target(&self, delegation: &Delegation) -> Result<(), DelegationServiceError> {
        let target = delegation.target();
        if self.contexts.find(target.level, target.id).await?.is_some() {
            return Ok(());
        }
        match target.level {
            ContextLevel::Global => {
                self.hierarchy.ensure_global().await?;
            }
            ContextLevel::Project => {
                self.create_empty(ContextLevel::Project, target.id, None).await?;
            }
            ContextLevel::Branch => {
                let project_id = self
                    .resolve_ancestor(delegation.source(), ContextLevel::Project)
                    .await?;
                if self
                    .contexts
                    .find(ContextLevel::Project, project_id)
                    .await?
                    .is_none()
                {
                    self.create_empty(ContextLevel::Project, project_id, None).await?;
                }
                self.create_empty(
                    ContextLevel::Branch,
                    target.id,
                    Some(ContextRef::new(ContextLevel::Project, project_id)),
                )
                .await?;
            }
            ContextLevel::Task => {
                return Err(ContextDomainError::DelegationNotUpward {
                    from: delegation.source().level,
                    to: target.level,
                }
                .into());
            }
        }
        info!(context = %target, "delegation target context created");
        Ok(())
    }

    async fn create_empty(
        &self,
        level: ContextLevel,
        id: ContextId,
        parent: Option<ContextRef>,
    ) -> Result<(), DelegationServiceError> {
        self.hierarchy
            .create_context(level, id, parent, Map::new())
            .await?;
        Ok(())
    }

    async fn resolve_ancestor(
        &self,
        source: ContextRef,
        level: ContextLevel,
    ) -> Result<ContextId, DelegationServiceError> {
        if source.level == ContextLevel::Task
            && let Some(task) = self
                .tasks
                .find_by_id(TaskId::from_uuid(source.id.into_inner()))
                .await?
        {
            let recorded = match level {
                ContextLevel::Project => task.project_id().map(ContextId::from),
                ContextLevel::Branch => task.branch_id().map(ContextId::from),
                ContextLevel::Global | ContextLevel::Task => None,
            };
            if let Some(id) = recorded {
                return Ok(id);
            }
        }
        if let Some(id) = self.find_ancestor_context(source, level).await? {
            return Ok(id);
        }
        if level == ContextLevel::Project
            && let Some(default_project) = self.config.default_project_id
        {
            return Ok(default_project);
        }
        Err(DelegationServiceError::UnresolvedTarget {
            origin: source,
            target_level: level,
        })
    }

    async fn find_ancestor_context(
        &self,
        source: ContextRef,
        level: ContextLevel,
    ) -> Result<Option<ContextId>, DelegationServiceError> {
        let mut current = self.contexts.find(source.level, source.id).await?;
        for _ in ContextLevel::ALL {
            let Some(parent) = current.as_ref().and_then(|context| context.parent()) else {
                return Ok(None);
            };
            if parent.level == level {
                return Ok(Some(parent.id));
            }
            current = self.contexts.find(parent.level, parent.id).await?;
        }
        Ok(None)
    }
}
