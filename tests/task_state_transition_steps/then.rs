//! Then steps for task status transition BDD scenarios.

use super::world::{TaskTransitionWorld, run_async};
use rstest_bdd_macros::then;
use stratum::task::{domain::TaskStatus, services::TaskLifecycleError};

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &TaskTransitionWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task_id = world
        .last_created_task
        .as_ref()
        .map(stratum::task::domain::Task::id)
        .ok_or_else(|| eyre::eyre!("missing created task"))?;

    let stored = run_async(world.service.find_task(task_id))?
        .ok_or_else(|| eyre::eyre!("task {task_id} missing from repository"))?;
    if stored.status() != expected {
        return Err(eyre::eyre!(
            "expected status {}, found {}",
            expected.as_str(),
            stored.status().as_str()
        ));
    }

    Ok(())
}

#[then(r#"the transition is rejected mentioning "{fragment}""#)]
fn transition_rejected_mentioning(
    world: &TaskTransitionWorld,
    fragment: String,
) -> Result<(), eyre::Report> {
    let result = world
        .last_transition_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;

    match result {
        Err(TaskLifecycleError::TransitionRejected { reason, .. })
            if reason.contains(&fragment) =>
        {
            Ok(())
        }
        other => Err(eyre::eyre!(
            "expected a rejection mentioning {fragment:?}, got {other:?}"
        )),
    }
}

#[then("the transition fails with an invalid status error")]
fn transition_fails_with_invalid_status(world: &TaskTransitionWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_transition_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;

    if !matches!(result, Err(TaskLifecycleError::InvalidStatus(_))) {
        return Err(eyre::eyre!(
            "expected invalid status error, got {result:?}"
        ));
    }

    Ok(())
}
