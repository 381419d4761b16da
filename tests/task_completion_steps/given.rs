//! Given steps for task completion BDD scenarios.

use super::world::{CompletionWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::Map;
use stratum::context::domain::{ContextId, ContextLevel, ContextRef};
use stratum::task::domain::{Task, TaskDraft};

fn start_task(world: &CompletionWorld, title: &str) -> Result<Task, eyre::Report> {
    let lifecycle = world.services.task_lifecycle();
    let created = run_async(lifecycle.create_task(TaskDraft::new(title)))
        .wrap_err("create task for completion scenario")?;
    let started = run_async(lifecycle.transition_task(created.id(), "in_progress"))
        .wrap_err("start task for completion scenario")?;
    Ok(started)
}

#[given(r#"an in-progress task "{title}" with a linked context"#)]
fn task_with_context(world: &mut CompletionWorld, title: String) -> Result<(), eyre::Report> {
    let task = start_task(world, &title)?;
    let context_id = ContextId::from(task.id());
    run_async(world.services.hierarchy().create_context(
        ContextLevel::Task,
        context_id,
        Some(ContextRef::global()),
        Map::new(),
    ))
    .wrap_err("create task context")?;
    let linked = run_async(world.services.task_lifecycle().link_context(task.id(), context_id))
        .wrap_err("link task context")?;
    world.task = Some(linked);
    Ok(())
}

#[given(r#"an in-progress task "{title}" without a context"#)]
fn task_without_context(world: &mut CompletionWorld, title: String) -> Result<(), eyre::Report> {
    let task = start_task(world, &title)?;
    world.task = Some(task);
    Ok(())
}

#[given(r#"the task has an open subtask "{title}""#)]
fn task_has_open_subtask(world: &mut CompletionWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    run_async(world.services.task_lifecycle().add_subtask(task_id, &title))
        .wrap_err("add subtask")?;
    Ok(())
}

#[given(r#"a blocked task "{title}" waiting on it"#)]
fn blocked_dependent(world: &mut CompletionWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let lifecycle = world.services.task_lifecycle();
    let dependent = run_async(
        lifecycle.create_task(TaskDraft::new(title).with_dependencies(vec![task_id])),
    )
    .wrap_err("create dependent task")?;
    run_async(lifecycle.transition_task(dependent.id(), "blocked"))
        .wrap_err("block dependent task")?;
    world.dependent_id = Some(dependent.id());
    Ok(())
}
