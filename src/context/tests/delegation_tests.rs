//! Tests for delegation routing, review and execution.

use std::sync::Arc;

use crate::context::{
    adapters::memory::{InMemoryContextRepository, InMemoryDelegationRepository},
    domain::{
        Context, ContextId, ContextLevel, ContextRef, Delegation, DelegationRequest,
        DelegationStatus,
    },
    ports::{
        ContextRepository, ContextRepositoryError, DelegationRepository,
        DelegationRepositoryError,
    },
    services::{
        ContextDelegationService, ContextHierarchyService, DelegationConfig,
        DelegationServiceError, QueueStatus,
    },
};
use crate::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{BranchId, ProjectId, Task, TaskDraft, TaskId, TaskLimits},
    ports::TaskRepository,
};
use crate::test_support::{FixedClock, MockContexts, MockDelegations, outage};
use eyre::ensure;
use rstest::{fixture, rstest};
use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

type TestService = ContextDelegationService<
    InMemoryContextRepository,
    InMemoryDelegationRepository,
    InMemoryTaskRepository,
    FixedClock,
>;

struct Harness {
    service: TestService,
    hierarchy: ContextHierarchyService<InMemoryContextRepository, FixedClock>,
    contexts: Arc<InMemoryContextRepository>,
    delegations: Arc<InMemoryDelegationRepository>,
    tasks: Arc<InMemoryTaskRepository>,
    clock: Arc<FixedClock>,
}

impl Harness {
    fn with_config(mut self, config: DelegationConfig) -> Self {
        self.service = self.service.with_config(config);
        self
    }

    /// Project, branch and task contexts linked in a chain.
    async fn chain(&self) -> (ContextId, ContextId, ContextId) {
        let project: ContextId = ProjectId::new().into();
        let branch: ContextId = BranchId::new().into();
        let task: ContextId = TaskId::new().into();
        self.hierarchy
            .create_context(ContextLevel::Project, project, None, Map::new())
            .await
            .expect("project");
        self.hierarchy
            .create_context(
                ContextLevel::Branch,
                branch,
                Some(ContextRef::new(ContextLevel::Project, project)),
                Map::new(),
            )
            .await
            .expect("branch");
        self.hierarchy
            .create_context(
                ContextLevel::Task,
                task,
                Some(ContextRef::new(ContextLevel::Branch, branch)),
                Map::new(),
            )
            .await
            .expect("task");
        (project, branch, task)
    }

    async fn data_of(&self, level: ContextLevel, id: ContextId) -> Map<String, Value> {
        self.contexts
            .find(level, id)
            .await
            .expect("lookup")
            .expect("context present")
            .data()
            .clone()
    }
}

#[fixture]
fn harness() -> Harness {
    let contexts = Arc::new(InMemoryContextRepository::new());
    let delegations = Arc::new(InMemoryDelegationRepository::new());
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let clock = Arc::new(FixedClock::start());
    Harness {
        service: ContextDelegationService::new(
            Arc::clone(&contexts),
            Arc::clone(&delegations),
            Arc::clone(&tasks),
            Arc::clone(&clock),
        ),
        hierarchy: ContextHierarchyService::new(Arc::clone(&contexts), Arc::clone(&clock)),
        contexts,
        delegations,
        tasks,
        clock,
    }
}

fn security_finding() -> Map<String, Value> {
    object(json!({"security": {"rule": "never log bearer tokens"}}))
}

fn team_note() -> Map<String, Value> {
    object(json!({"convention": "one commit per logical change"}))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn high_impact_delegations_are_auto_applied(harness: Harness) -> eyre::Result<()> {
    let (_, _, task) = harness.chain().await;

    let result = harness
        .service
        .process_delegation(DelegationRequest::new(
            ContextLevel::Task,
            task,
            ContextLevel::Global,
            security_finding(),
            "applies to every project",
        ))
        .await;

    ensure!(result.success, "delegation should succeed: {}", result.message);
    ensure!(result.auto_approved && result.approved && result.processed, "auto-applied");
    ensure!(result.target == Some(ContextRef::global()), "global target");
    let global = harness.data_of(ContextLevel::Global, ContextId::GLOBAL).await;
    ensure!(
        global.get("security") == Some(&json!({"rule": "never log bearer tokens"})),
        "payload merged"
    );
    let pending = harness.service.list_pending(10).await?;
    ensure!(pending.is_empty(), "nothing waiting for review");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn low_impact_delegations_wait_for_review(harness: Harness) -> eyre::Result<()> {
    let (project, _, task) = harness.chain().await;

    let queued = harness
        .service
        .process_delegation(DelegationRequest::new(
            ContextLevel::Task,
            task,
            ContextLevel::Project,
            team_note(),
            "team habit",
        ))
        .await;

    ensure!(queued.success && !queued.processed, "queued, not applied");
    ensure!(queued.status == Some(DelegationStatus::Pending), "pending");
    ensure!(
        queued.target == Some(ContextRef::new(ContextLevel::Project, project)),
        "project found through the context ancestry"
    );
    ensure!(
        harness.data_of(ContextLevel::Project, project).await.is_empty(),
        "target untouched before review"
    );

    let id = queued.delegation_id.ok_or_else(|| eyre::eyre!("id missing"))?;
    let approved = harness.service.approve_delegation(id, "lead-1").await;
    ensure!(approved.success && approved.processed, "applied on approval");
    ensure!(!approved.auto_approved, "reviewer approval");
    ensure!(
        harness.data_of(ContextLevel::Project, project).await == team_note(),
        "payload merged into project"
    );

    let stored = harness
        .service
        .find_delegation(id)
        .await?
        .ok_or_else(|| eyre::eyre!("delegation missing"))?;
    ensure!(stored.reviewed_by() == Some("lead-1"), "reviewer recorded");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reviews_happen_at_most_once(harness: Harness) -> eyre::Result<()> {
    let (project, _, task) = harness.chain().await;
    let queued = harness
        .service
        .process_delegation(DelegationRequest::new(
            ContextLevel::Task,
            task,
            ContextLevel::Project,
            team_note(),
            "",
        ))
        .await;
    let id = queued.delegation_id.ok_or_else(|| eyre::eyre!("id missing"))?;

    let rejected = harness
        .service
        .reject_delegation(id, "lead-1", Some("too specific"))
        .await;
    ensure!(rejected.success, "rejection succeeds");
    ensure!(rejected.status == Some(DelegationStatus::Rejected), "rejected");

    let late = harness.service.approve_delegation(id, "lead-2").await;
    ensure!(!late.success, "second review refused");
    ensure!(late.delegation_id == Some(id), "failure names the delegation");
    ensure!(
        harness.data_of(ContextLevel::Project, project).await.is_empty(),
        "rejected payload never applied"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_review_conflicts_do_not_apply(harness: Harness) {
    let pending = Delegation::new(
        DelegationRequest::new(
            ContextLevel::Branch,
            BranchId::new().into(),
            ContextLevel::Global,
            team_note(),
            "",
        ),
        ContextId::GLOBAL,
        &*harness.clock,
    );
    let id = pending.id();
    let mut delegations = MockDelegations::new();
    delegations
        .expect_find_by_id()
        .returning(move |_| Ok(Some(pending.clone())));
    delegations.expect_update().returning(|delegation, expected| {
        Err(DelegationRepositoryError::Conflict {
            id: delegation.id(),
            expected,
            actual: DelegationStatus::Approved,
        })
    });
    let service = ContextDelegationService::new(
        Arc::clone(&harness.contexts),
        Arc::new(delegations),
        Arc::clone(&harness.tasks),
        Arc::clone(&harness.clock),
    );

    let result = service.approve_delegation(id, "lead-2").await;

    assert!(!result.success);
    assert!(!result.processed);
    let global = harness
        .contexts
        .find(ContextLevel::Global, ContextId::GLOBAL)
        .await
        .expect("lookup");
    assert!(global.is_none_or(|context| context.data().is_empty()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unprepared_targets_leave_the_delegation_pending(harness: Harness) -> eyre::Result<()> {
    let branch: ContextId = BranchId::new().into();
    let request = DelegationRequest::new(
        ContextLevel::Task,
        TaskId::new().into(),
        ContextLevel::Branch,
        security_finding(),
        "",
    )
    .with_target_id(branch);

    let result = harness.service.process_delegation(request).await;

    ensure!(!result.success && !result.approved && !result.processed, "not applied");
    ensure!(result.status == Some(DelegationStatus::Pending), "still pending");
    ensure!(
        result.error.as_deref().is_some_and(|err| err.contains("cannot resolve project")),
        "cause reported: {:?}",
        result.error
    );
    let id = result
        .delegation_id
        .ok_or_else(|| eyre::eyre!("delegation id missing"))?;
    let stored = harness
        .delegations
        .find_by_id(id)
        .await?
        .ok_or_else(|| eyre::eyre!("delegation missing"))?;
    ensure!(stored.status() == DelegationStatus::Pending, "stored as pending");
    ensure!(!stored.is_auto_approved(), "no approval recorded");

    let project: ContextId = ProjectId::new().into();
    harness
        .hierarchy
        .create_context(ContextLevel::Project, project, None, Map::new())
        .await?;
    harness
        .hierarchy
        .create_context(
            ContextLevel::Branch,
            branch,
            Some(ContextRef::new(ContextLevel::Project, project)),
            Map::new(),
        )
        .await?;
    let retried = harness.service.approve_delegation(id, "lead-1").await;

    ensure!(retried.success && retried.processed, "applied: {}", retried.message);
    ensure!(
        harness.data_of(ContextLevel::Branch, branch).await == security_finding(),
        "payload merged on retry"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_merges_return_the_delegation_to_review(harness: Harness) -> eyre::Result<()> {
    let global = Context::global(Map::new(), &*harness.clock);
    let mut contexts = MockContexts::new();
    contexts
        .expect_find()
        .returning(move |_, _| Ok(Some(global.clone())));
    contexts
        .expect_update()
        .returning(|_, _| Err(ContextRepositoryError::persistence(outage())));
    let service = ContextDelegationService::new(
        Arc::new(contexts),
        Arc::clone(&harness.delegations),
        Arc::clone(&harness.tasks),
        Arc::clone(&harness.clock),
    );

    let result = service
        .process_delegation(DelegationRequest::new(
            ContextLevel::Project,
            ProjectId::new().into(),
            ContextLevel::Global,
            security_finding(),
            "",
        ))
        .await;

    ensure!(!result.success && !result.processed, "merge failed");
    ensure!(!result.approved, "approval withdrawn");
    ensure!(result.status == Some(DelegationStatus::Pending), "back in review");
    let pending = harness.delegations.find_pending(10).await?;
    ensure!(
        pending.iter().map(Delegation::id).collect::<Vec<_>>() == vec![
            result
                .delegation_id
                .ok_or_else(|| eyre::eyre!("delegation id missing"))?
        ],
        "delegation can be reviewed again"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_requests_fail_without_recording(harness: Harness) -> eyre::Result<()> {
    let downward = harness
        .service
        .process_delegation(DelegationRequest::new(
            ContextLevel::Project,
            ProjectId::new().into(),
            ContextLevel::Task,
            team_note(),
            "",
        ))
        .await;
    ensure!(!downward.success && downward.error.is_some(), "downward refused");

    let bad_level = harness
        .service
        .process_delegation_str("team", TaskId::new().into(), "global", None, team_note(), "")
        .await;
    ensure!(!bad_level.success, "unknown level refused");

    ensure!(harness.delegations.count_pending().await? == 0, "nothing stored");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn string_levels_are_parsed(harness: Harness) {
    let (_, branch, task) = harness.chain().await;

    let result = harness
        .service
        .process_delegation_str("Task", task, "branch", None, security_finding(), "")
        .await;

    assert!(result.success);
    assert_eq!(result.target, Some(ContextRef::new(ContextLevel::Branch, branch)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recorded_task_project_wins_over_ancestry(harness: Harness) -> eyre::Result<()> {
    let project = ProjectId::new();
    let task = Task::create(
        TaskDraft::new("Audit logging").with_project(project),
        &TaskLimits::default(),
        &*harness.clock,
    )?;
    harness.tasks.store(&task).await?;
    let request = DelegationRequest::new(
        ContextLevel::Task,
        task.id().into(),
        ContextLevel::Project,
        team_note(),
        "",
    );

    let target = harness.service.resolve_target_id(&request).await?;

    ensure!(target == ContextId::from(project), "task's project used");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_targets_and_defaults(#[from(harness)] base: Harness) -> eyre::Result<()> {
    let default_project: ContextId = ProjectId::new().into();
    let harness = base.with_config(DelegationConfig {
        default_project_id: Some(default_project),
        ..DelegationConfig::default()
    });
    let orphan = DelegationRequest::new(
        ContextLevel::Task,
        TaskId::new().into(),
        ContextLevel::Project,
        team_note(),
        "",
    );

    ensure!(
        harness.service.resolve_target_id(&orphan).await? == default_project,
        "configured default applies"
    );
    let explicit: ContextId = ProjectId::new().into();
    ensure!(
        harness
            .service
            .resolve_target_id(&orphan.clone().with_target_id(explicit))
            .await?
            == explicit,
        "explicit target wins"
    );

    let branch_orphan = DelegationRequest::new(
        ContextLevel::Task,
        TaskId::new().into(),
        ContextLevel::Branch,
        team_note(),
        "",
    );
    ensure!(
        matches!(
            harness.service.resolve_target_id(&branch_orphan).await,
            Err(DelegationServiceError::UnresolvedTarget { .. })
        ),
        "branches have no default"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_creates_missing_targets(harness: Harness) -> eyre::Result<()> {
    let project = ProjectId::new();
    let branch = BranchId::new();
    let task = Task::create(
        TaskDraft::new("Harden uploads")
            .with_project(project)
            .with_branch(branch),
        &TaskLimits::default(),
        &*harness.clock,
    )?;
    harness.tasks.store(&task).await?;

    let result = harness
        .service
        .process_delegation(DelegationRequest::new(
            ContextLevel::Task,
            task.id().into(),
            ContextLevel::Branch,
            security_finding(),
            "",
        ))
        .await;

    ensure!(result.success && result.processed, "applied: {}", result.message);
    let branch_context = harness
        .contexts
        .find(ContextLevel::Branch, branch.into())
        .await?
        .ok_or_else(|| eyre::eyre!("branch context missing"))?;
    ensure!(
        branch_context.parent() == Some(ContextRef::new(ContextLevel::Project, project.into())),
        "branch hangs off the task's project"
    );
    ensure!(branch_context.data() == &security_finding(), "payload merged");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn queue_health_reflects_pending_count(#[from(harness)] base: Harness) -> eyre::Result<()> {
    let harness = base.with_config(DelegationConfig {
        max_pending_delegations: 1,
        ..DelegationConfig::default()
    });
    let (_, _, task) = harness.chain().await;

    let empty = harness.service.queue_health().await;
    ensure!(empty.status == QueueStatus::Healthy, "empty queue is healthy");

    for _ in 0..2 {
        harness
            .service
            .process_delegation(DelegationRequest::new(
                ContextLevel::Task,
                task,
                ContextLevel::Project,
                team_note(),
                "",
            ))
            .await;
    }

    let full = harness.service.queue_health().await;
    ensure!(full.status == QueueStatus::Unhealthy, "over capacity");
    ensure!(full.pending_count == Some(2), "count reported");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn queue_health_is_unknown_when_storage_fails(harness: Harness) {
    let mut delegations = MockDelegations::new();
    delegations
        .expect_count_pending()
        .returning(|| Err(DelegationRepositoryError::persistence(outage())));
    let service = ContextDelegationService::new(
        Arc::clone(&harness.contexts),
        Arc::new(delegations),
        Arc::clone(&harness.tasks),
        Arc::clone(&harness.clock),
    );

    let health = service.queue_health().await;

    assert_eq!(health.status, QueueStatus::Unknown);
    assert!(health.pending_count.is_none());
}
