//! End-to-end task flows: transitions, scoring and validated completion.

use std::sync::Arc;

use super::helpers::{ManualClock, TestContext, object, services};
use eyre::ensure;
use rstest::rstest;
use serde_json::json;
use stratum::context::domain::{ContextId, ContextLevel, ContextRef};
use stratum::service_context::Backend;
use stratum::task::{
    domain::{ProjectId, TaskDraft, TaskEventKind, TaskStatus},
    services::CompleteTaskRequest,
};

#[expect(clippy::float_arithmetic, reason = "tolerance check on scores")]
fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_moves_from_todo_to_done_with_validated_completion(
    services: (TestContext, Arc<ManualClock>),
) -> eyre::Result<()> {
    let (ctx, _clock) = services;
    let lifecycle = ctx.task_lifecycle();
    let project_id = ProjectId::new();
    let task = lifecycle
        .create_task(
            TaskDraft::new("Wire the release pipeline")
                .with_project(project_id)
                .with_assignees(vec!["agent-7".to_owned()]),
        )
        .await?;

    let project_context: ContextId = project_id.into();
    let hierarchy = ctx.hierarchy();
    hierarchy
        .create_context(
            ContextLevel::Project,
            project_context,
            None,
            object(json!({"stack": {"ci": "actions"}})),
        )
        .await?;
    let task_context: ContextId = task.id().into();
    hierarchy
        .create_context(
            ContextLevel::Task,
            task_context,
            Some(ContextRef::new(ContextLevel::Project, project_context)),
            object(json!({"notes": "pipeline lives in .ci/"})),
        )
        .await?;
    lifecycle.link_context(task.id(), task_context).await?;

    let first = lifecycle.add_subtask(task.id(), "Add build stage").await?;
    let second = lifecycle.add_subtask(task.id(), "Add deploy stage").await?;
    let in_progress = lifecycle.transition_task(task.id(), "in_progress").await?;
    lifecycle.complete_subtask(first.id()).await?;

    let report = ctx.progress().calculate_task_progress(&in_progress).await;
    ensure!(report.subtasks.total == 2 && report.subtasks.completed == 1, "subtask counts");
    ensure!(
        approx(report.overall_percentage, 50.0),
        "weighted progress, got {}",
        report.overall_percentage
    );
    ensure!(!report.can_complete, "one subtask still open");

    let blocked = ctx
        .completion()
        .complete_task(CompleteTaskRequest::new(task.id(), "Pipeline wired"))
        .await;
    ensure!(!blocked.success, "open subtask blocks completion");
    ensure!(
        blocked.blockers == vec!["1 of 2 subtasks incomplete".to_owned()],
        "blockers: {:?}",
        blocked.blockers
    );

    lifecycle.complete_subtask(second.id()).await?;
    let outcome = ctx
        .completion()
        .complete_task(
            CompleteTaskRequest::new(task.id(), "Pipeline wired")
                .with_testing_notes("dry run against staging"),
        )
        .await;
    ensure!(outcome.success, "completion should succeed: {}", outcome.message);
    ensure!(!outcome.forced && outcome.context_synced, "clean completion synced");

    let stored = lifecycle
        .find_task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task missing"))?;
    ensure!(stored.status() == TaskStatus::Done, "task is done");
    ensure!(stored.completion_summary() == Some("Pipeline wired"), "summary kept");

    let resolved = hierarchy
        .resolve_context(ContextLevel::Task, task_context)
        .await?;
    ensure!(
        resolved.data.get("stack") == Some(&json!({"ci": "actions"})),
        "project data inherited"
    );
    let completion = resolved
        .data
        .get("completion")
        .ok_or_else(|| eyre::eyre!("completion not synced"))?;
    ensure!(
        completion.get("testing_notes") == Some(&json!("dry run against staging")),
        "testing notes synced"
    );

    let completed_events = ctx
        .backend()
        .events()
        .events_for(task.id(), TaskEventKind::TaskCompleted);
    ensure!(completed_events.len() == 1, "one completion event");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_the_last_dependency_unblocks_dependents(
    services: (TestContext, Arc<ManualClock>),
) -> eyre::Result<()> {
    let (ctx, _clock) = services;
    let lifecycle = ctx.task_lifecycle();
    let schema = lifecycle.create_task(TaskDraft::new("Design schema")).await?;
    let api = lifecycle.create_task(TaskDraft::new("Build API")).await?;
    let client = lifecycle
        .create_task(TaskDraft::new("Ship client").with_dependencies(vec![schema.id(), api.id()]))
        .await?;
    lifecycle.transition_task(client.id(), "blocked").await?;

    let first = ctx
        .completion()
        .complete_task(CompleteTaskRequest::new(schema.id(), "Schema approved").forced())
        .await;
    ensure!(first.success && first.forced, "forced past the missing context");
    let still_blocked = lifecycle
        .find_task(client.id())
        .await?
        .ok_or_else(|| eyre::eyre!("client missing"))?;
    ensure!(still_blocked.status() == TaskStatus::Blocked, "api still open");

    let second = ctx
        .completion()
        .complete_task(CompleteTaskRequest::new(api.id(), "API merged").forced())
        .await;
    let resolution = second
        .dependency_resolution
        .ok_or_else(|| eyre::eyre!("resolution missing"))?;
    ensure!(resolution.updates.len() == 1, "client unblocked");
    ensure!(
        resolution
            .updates
            .first()
            .is_some_and(|update| update.task_id == client.id()
                && update.new_status == TaskStatus::Todo),
        "client returned to todo"
    );

    let unblocked = ctx
        .backend()
        .events()
        .events_for(client.id(), TaskEventKind::TaskUnblocked);
    ensure!(
        unblocked
            .first()
            .and_then(|event| event.metadata_value("unblocked_by"))
            == Some(&json!(api.id().to_string())),
        "unblock event names the finishing task"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transition_hints_follow_the_status_machine(
    services: (TestContext, Arc<ManualClock>),
) -> eyre::Result<()> {
    let (ctx, _clock) = services;
    let lifecycle = ctx.task_lifecycle();
    let task = lifecycle.create_task(TaskDraft::new("Profile hot path")).await?;
    let transitions = ctx.transitions();

    ensure!(
        transitions.suggest_next_status(&task) == Some(TaskStatus::InProgress),
        "todo leads to in_progress"
    );
    let review = transitions.can_transition(&task, TaskStatus::Review).await;
    ensure!(!review.is_allowed(), "review requires in_progress");

    let working = lifecycle.transition_task(task.id(), "in_progress").await?;
    lifecycle.add_subtask(task.id(), "Collect flamegraph").await?;
    let hints = transitions.allowed_transitions(&working).await;
    let done = hints
        .iter()
        .find(|hint| hint.status == TaskStatus::Done)
        .ok_or_else(|| eyre::eyre!("done hint missing"))?;
    ensure!(!done.available, "open subtask hides done");
    ensure!(
        hints
            .iter()
            .any(|hint| hint.status == TaskStatus::Review && hint.available),
        "review is available"
    );
    Ok(())
}
