//! Given steps for task status transition BDD scenarios.

use super::world::{TaskTransitionWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use stratum::task::domain::TaskDraft;

#[given(r#"a task titled "{title}""#)]
fn task_titled(world: &mut TaskTransitionWorld, title: String) -> Result<(), eyre::Report> {
    let created = run_async(world.service.create_task(TaskDraft::new(title)))
        .wrap_err("create task for transition scenario")?;
    world.last_created_task = Some(created);
    Ok(())
}

#[given(r#"the task has already been moved to "{status}""#)]
fn task_already_moved(world: &mut TaskTransitionWorld, status: String) -> Result<(), eyre::Report> {
    let task_id = world
        .last_created_task
        .as_ref()
        .map(stratum::task::domain::Task::id)
        .ok_or_else(|| eyre::eyre!("missing created task in scenario world"))?;
    let moved = run_async(world.service.transition_task(task_id, &status))
        .wrap_err("move task before the scenario action")?;
    world.last_created_task = Some(moved);
    Ok(())
}
