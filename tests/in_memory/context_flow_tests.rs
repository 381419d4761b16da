//! Context inheritance and delegation through the service container.

use std::sync::Arc;

use super::helpers::{ManualClock, TestContext, clock, object, services};
use eyre::ensure;
use rstest::rstest;
use serde_json::json;
use stratum::config::EngineConfig;
use stratum::context::{
    domain::{ContextId, ContextLevel, ContextRef, DelegationRequest, DelegationStatus},
    services::QueueStatus,
};
use stratum::service_context::{InMemoryBackend, ServiceContext};
use stratum::task::domain::{BranchId, ProjectId, TaskDraft};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delegated_insights_reach_every_descendant(
    services: (TestContext, Arc<ManualClock>),
) -> eyre::Result<()> {
    let (ctx, _clock) = services;
    let project_id = ProjectId::new();
    let branch_id = BranchId::new();
    let task = ctx
        .task_lifecycle()
        .create_task(
            TaskDraft::new("Rotate signing keys")
                .with_project(project_id)
                .with_branch(branch_id),
        )
        .await?;

    let hierarchy = ctx.hierarchy();
    let project: ContextId = project_id.into();
    let branch: ContextId = branch_id.into();
    let task_context: ContextId = task.id().into();
    hierarchy
        .create_context(ContextLevel::Project, project, None, object(json!({"lang": "rust"})))
        .await?;
    hierarchy
        .create_context(
            ContextLevel::Branch,
            branch,
            Some(ContextRef::new(ContextLevel::Project, project)),
            object(json!({"lang": "rust-nightly"})),
        )
        .await?;
    hierarchy
        .create_context(
            ContextLevel::Task,
            task_context,
            Some(ContextRef::new(ContextLevel::Branch, branch)),
            object(json!({})),
        )
        .await?;

    let queued = ctx
        .delegation()
        .process_delegation(DelegationRequest::new(
            ContextLevel::Task,
            task_context,
            ContextLevel::Project,
            object(json!({"convention": "keys rotate quarterly"})),
            "team habit worth sharing",
        ))
        .await;
    ensure!(queued.success && !queued.processed, "queued for review");
    ensure!(
        queued.target == Some(ContextRef::new(ContextLevel::Project, project)),
        "project taken from the task record"
    );
    let pending = ctx.delegation().list_pending(10).await?;
    ensure!(pending.len() == 1, "one delegation pending");

    let id = queued
        .delegation_id
        .ok_or_else(|| eyre::eyre!("delegation id missing"))?;
    let approved = ctx.delegation().approve_delegation(id, "lead-2").await;
    ensure!(approved.success && approved.approved, "approved: {}", approved.message);

    let resolved = hierarchy
        .resolve_context(ContextLevel::Task, task_context)
        .await?;
    ensure!(
        resolved.chain
            == vec![
                ContextRef::global(),
                ContextRef::new(ContextLevel::Project, project),
                ContextRef::new(ContextLevel::Branch, branch),
                ContextRef::new(ContextLevel::Task, task_context),
            ],
        "chain runs broadest first"
    );
    ensure!(
        resolved.data.get("convention") == Some(&json!("keys rotate quarterly")),
        "delegated insight inherited"
    );
    ensure!(
        resolved.data.get("lang") == Some(&json!("rust-nightly")),
        "narrower level wins"
    );

    let stored = ctx
        .delegation()
        .find_delegation(id)
        .await?
        .ok_or_else(|| eyre::eyre!("delegation missing"))?;
    ensure!(stored.status() == DelegationStatus::Approved, "status recorded");
    ensure!(ctx.delegation().list_pending(10).await?.is_empty(), "queue drained");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn security_findings_are_applied_to_global_immediately(
    services: (TestContext, Arc<ManualClock>),
) -> eyre::Result<()> {
    let (ctx, _clock) = services;
    let project: ContextId = ProjectId::new().into();
    ctx.hierarchy()
        .create_context(ContextLevel::Project, project, None, object(json!({})))
        .await?;

    let result = ctx
        .delegation()
        .process_delegation(DelegationRequest::new(
            ContextLevel::Project,
            project,
            ContextLevel::Global,
            object(json!({"security": "pin TLS roots; tested in CI"})),
            "cross-project vulnerability",
        ))
        .await;
    ensure!(result.auto_approved && result.processed, "auto-applied: {}", result.message);

    let resolved = ctx
        .hierarchy()
        .resolve_context(ContextLevel::Project, project)
        .await?;
    ensure!(
        resolved.data.get("security") == Some(&json!("pin TLS roots; tested in CI")),
        "global data visible from the project"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn queue_health_follows_configured_capacity(clock: Arc<ManualClock>) -> eyre::Result<()> {
    let mut config = EngineConfig::default();
    config.delegation.max_pending_delegations = 1;
    let ctx = ServiceContext::with_config(InMemoryBackend::with_clock(clock), config);

    let project: ContextId = ProjectId::new().into();
    ctx.hierarchy()
        .create_context(ContextLevel::Project, project, None, object(json!({})))
        .await?;
    for note in ["prefer small pull requests", "review within a day"] {
        let queued = ctx
            .delegation()
            .process_delegation(DelegationRequest::new(
                ContextLevel::Project,
                project,
                ContextLevel::Global,
                object(json!({"note": note})),
                "shared practice",
            ))
            .await;
        ensure!(queued.success && !queued.processed, "queued: {}", queued.message);
    }

    let health = ctx.delegation().queue_health().await;
    ensure!(health.status == QueueStatus::Unhealthy, "over capacity");
    ensure!(health.pending_count == Some(2), "both pending");
    Ok(())
}
