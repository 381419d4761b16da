//! When steps for task completion BDD scenarios.

use super::world::{CompletionWorld, run_async};
use rstest_bdd_macros::when;
use stratum::task::services::CompleteTaskRequest;

#[when(r#"the task is completed with summary "{summary}""#)]
fn complete_task(world: &mut CompletionWorld, summary: String) -> Result<(), eyre::Report> {
    let request = CompleteTaskRequest::new(world.task_id()?, summary);
    world.outcome = Some(run_async(world.services.completion().complete_task(request)));
    Ok(())
}

#[when(r#"the task is force-completed with summary "{summary}""#)]
fn force_complete_task(world: &mut CompletionWorld, summary: String) -> Result<(), eyre::Report> {
    let request = CompleteTaskRequest::new(world.task_id()?, summary).forced();
    world.outcome = Some(run_async(world.services.completion().complete_task(request)));
    Ok(())
}
