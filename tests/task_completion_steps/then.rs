//! Then steps for task completion BDD scenarios.

use super::world::{CompletionWorld, run_async};
use rstest_bdd_macros::then;
use serde_json::Value;
use stratum::context::domain::{ContextId, ContextLevel};
use stratum::task::domain::{TaskId, TaskStatus};

fn stored_status(world: &CompletionWorld, task_id: TaskId) -> Result<TaskStatus, eyre::Report> {
    let stored = run_async(world.services.task_lifecycle().find_task(task_id))?
        .ok_or_else(|| eyre::eyre!("task {task_id} missing from repository"))?;
    Ok(stored.status())
}

fn expect_status(actual: TaskStatus, expected: &str) -> Result<(), eyre::Report> {
    let wanted = TaskStatus::try_from(expected)
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    if actual != wanted {
        return Err(eyre::eyre!("expected status {wanted}, found {actual}"));
    }
    Ok(())
}

#[then("the completion succeeds")]
fn completion_succeeds(world: &CompletionWorld) -> Result<(), eyre::Report> {
    let outcome = world.outcome()?;
    if !outcome.success || outcome.forced {
        return Err(eyre::eyre!("expected a clean completion, got {outcome:?}"));
    }
    Ok(())
}

#[then("the completion succeeds with context checks bypassed")]
fn completion_forced(world: &CompletionWorld) -> Result<(), eyre::Report> {
    let outcome = world.outcome()?;
    if !outcome.success || !outcome.forced || outcome.bypassed.is_empty() {
        return Err(eyre::eyre!("expected a forced completion, got {outcome:?}"));
    }
    Ok(())
}

#[then(r#"the completion is blocked mentioning "{fragment}""#)]
fn completion_blocked(world: &CompletionWorld, fragment: String) -> Result<(), eyre::Report> {
    let outcome = world.outcome()?;
    if outcome.success {
        return Err(eyre::eyre!("expected completion to be blocked"));
    }
    if !outcome
        .blockers
        .iter()
        .any(|blocker| blocker.contains(&fragment))
    {
        return Err(eyre::eyre!(
            "no blocker mentions {fragment:?}: {:?}",
            outcome.blockers
        ));
    }
    Ok(())
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &CompletionWorld, status: String) -> Result<(), eyre::Report> {
    let actual = stored_status(world, world.task_id()?)?;
    expect_status(actual, &status)
}

#[then(r#"the dependent task status is "{status}""#)]
fn dependent_status_is(world: &CompletionWorld, status: String) -> Result<(), eyre::Report> {
    let dependent_id = world
        .dependent_id
        .ok_or_else(|| eyre::eyre!("missing dependent task in scenario world"))?;
    let actual = stored_status(world, dependent_id)?;
    expect_status(actual, &status)
}

#[then(r#"the task context records the summary "{summary}""#)]
fn context_records_summary(world: &CompletionWorld, summary: String) -> Result<(), eyre::Report> {
    let context_id = ContextId::from(world.task_id()?);
    let context = run_async(
        world
            .services
            .hierarchy()
            .get_context(ContextLevel::Task, context_id),
    )?;
    let recorded = context
        .data()
        .get("completion")
        .and_then(|completion| completion.get("summary"))
        .and_then(Value::as_str);
    if recorded != Some(summary.as_str()) {
        return Err(eyre::eyre!(
            "expected summary {summary:?} in task context, found {recorded:?}"
        ));
    }
    Ok(())
}
