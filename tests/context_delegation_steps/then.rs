//! Then steps for context delegation BDD scenarios.

use super::world::{DelegationWorld, run_async};
use rstest_bdd_macros::then;
use stratum::context::{
    domain::{ContextId, ContextLevel, DelegationStatus},
    services::DelegationResult,
};

fn last_delegation(world: &DelegationWorld) -> Result<&DelegationResult, eyre::Report> {
    world
        .last_delegation
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing delegation result"))
}

fn holds(
    world: &DelegationWorld,
    level: ContextLevel,
    id: ContextId,
    key: &str,
) -> Result<bool, eyre::Report> {
    let context = run_async(world.services.hierarchy().get_context(level, id))?;
    Ok(context.data().contains_key(key))
}

#[then("the delegation was applied automatically")]
fn applied_automatically(world: &DelegationWorld) -> Result<(), eyre::Report> {
    let result = last_delegation(world)?;
    if !(result.success && result.auto_approved && result.processed) {
        return Err(eyre::eyre!("expected auto-applied delegation, got {result:?}"));
    }
    Ok(())
}

#[then("the delegation is pending review")]
fn pending_review(world: &DelegationWorld) -> Result<(), eyre::Report> {
    let result = last_delegation(world)?;
    if !result.success || result.status != Some(DelegationStatus::Pending) {
        return Err(eyre::eyre!("expected pending delegation, got {result:?}"));
    }
    Ok(())
}

#[then("the last review failed")]
fn last_review_failed(world: &DelegationWorld) -> Result<(), eyre::Report> {
    let review = world
        .last_review
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing review result"))?;
    if review.success {
        return Err(eyre::eyre!("expected the review to fail, got {review:?}"));
    }
    Ok(())
}

#[then(r#"the global context holds "{key}""#)]
fn global_holds(world: &DelegationWorld, key: String) -> Result<(), eyre::Report> {
    if !holds(world, ContextLevel::Global, ContextId::GLOBAL, &key)? {
        return Err(eyre::eyre!("global context lacks {key:?}"));
    }
    Ok(())
}

#[then(r#"the project context holds "{key}""#)]
fn project_holds(world: &DelegationWorld, key: String) -> Result<(), eyre::Report> {
    if !holds(world, ContextLevel::Project, world.project()?, &key)? {
        return Err(eyre::eyre!("project context lacks {key:?}"));
    }
    Ok(())
}

#[then(r#"the project context does not hold "{key}""#)]
fn project_lacks(world: &DelegationWorld, key: String) -> Result<(), eyre::Report> {
    if holds(world, ContextLevel::Project, world.project()?, &key)? {
        return Err(eyre::eyre!("project context unexpectedly holds {key:?}"));
    }
    Ok(())
}

#[then(r#"the task context inherits "{key}""#)]
fn task_inherits(world: &DelegationWorld, key: String) -> Result<(), eyre::Report> {
    let resolved = run_async(
        world
            .services
            .hierarchy()
            .resolve_context(ContextLevel::Task, world.task()?),
    )?;
    if !resolved.data.contains_key(&key) {
        return Err(eyre::eyre!("task context does not inherit {key:?}"));
    }
    Ok(())
}
