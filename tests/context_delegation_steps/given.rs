//! Given steps for context delegation BDD scenarios.

use super::world::{DelegationWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::Map;
use stratum::context::domain::{ContextId, ContextLevel, ContextRef};
use stratum::task::domain::{ProjectId, TaskId};

#[given("a project context")]
fn project_context(world: &mut DelegationWorld) -> Result<(), eyre::Report> {
    let project = ContextId::from(ProjectId::new());
    run_async(world.services.hierarchy().create_context(
        ContextLevel::Project,
        project,
        None,
        Map::new(),
    ))
    .wrap_err("create project context")?;
    world.project = Some(project);
    Ok(())
}

#[given("a task context under the project")]
fn task_context(world: &mut DelegationWorld) -> Result<(), eyre::Report> {
    let project = world.project()?;
    let task = ContextId::from(TaskId::new());
    run_async(world.services.hierarchy().create_context(
        ContextLevel::Task,
        task,
        Some(ContextRef::new(ContextLevel::Project, project)),
        Map::new(),
    ))
    .wrap_err("create task context")?;
    world.task = Some(task);
    Ok(())
}

#[given(r#"the task delegates "{key}" as "{value}" to the project context"#)]
fn task_already_delegated(
    world: &mut DelegationWorld,
    key: String,
    value: String,
) -> Result<(), eyre::Report> {
    let task = world.task()?;
    world.delegate((ContextLevel::Task, task), ContextLevel::Project, key, value);
    Ok(())
}
