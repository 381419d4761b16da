//! When steps for context delegation BDD scenarios.

use super::world::{DelegationWorld, run_async};
use rstest_bdd_macros::when;
use stratum::context::domain::ContextLevel;

#[when(r#"the project delegates "{key}" as "{value}" to the global context"#)]
fn project_delegates_to_global(
    world: &mut DelegationWorld,
    key: String,
    value: String,
) -> Result<(), eyre::Report> {
    let project = world.project()?;
    world.delegate((ContextLevel::Project, project), ContextLevel::Global, key, value);
    Ok(())
}

#[when(r#"the task delegates "{key}" as "{value}" to the project context"#)]
fn task_delegates_to_project(
    world: &mut DelegationWorld,
    key: String,
    value: String,
) -> Result<(), eyre::Report> {
    let task = world.task()?;
    world.delegate((ContextLevel::Task, task), ContextLevel::Project, key, value);
    Ok(())
}

#[when(r#"reviewer "{reviewer}" approves the delegation"#)]
fn reviewer_approves(world: &mut DelegationWorld, reviewer: String) -> Result<(), eyre::Report> {
    let id = pending_id(world)?;
    let result = run_async(world.services.delegation().approve_delegation(id, &reviewer));
    world.last_review = Some(result);
    Ok(())
}

#[when(r#"reviewer "{reviewer}" rejects the delegation"#)]
fn reviewer_rejects(world: &mut DelegationWorld, reviewer: String) -> Result<(), eyre::Report> {
    let id = pending_id(world)?;
    let result = run_async(world.services.delegation().reject_delegation(
        id,
        &reviewer,
        Some("too specific to this task"),
    ));
    world.last_review = Some(result);
    Ok(())
}

fn pending_id(
    world: &DelegationWorld,
) -> Result<stratum::context::domain::DelegationId, eyre::Report> {
    world
        .last_delegation
        .as_ref()
        .and_then(|result| result.delegation_id)
        .ok_or_else(|| eyre::eyre!("no delegation recorded in scenario world"))
}
