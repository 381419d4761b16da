//! Behaviour tests for validated task completion.

#[path = "task_completion_steps/mod.rs"]
mod task_completion_steps_defs;

use rstest_bdd_macros::scenario;
use task_completion_steps_defs::world::{CompletionWorld, world};

#[scenario(
    path = "tests/features/task_completion.feature",
    name = "Complete a task with a linked context"
)]
#[tokio::test(flavor = "multi_thread")]
async fn complete_with_linked_context(world: CompletionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_completion.feature",
    name = "Refuse completion without a task context"
)]
#[tokio::test(flavor = "multi_thread")]
async fn refuse_completion_without_context(world: CompletionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_completion.feature",
    name = "Force completion past a missing context"
)]
#[tokio::test(flavor = "multi_thread")]
async fn force_completion_past_missing_context(world: CompletionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_completion.feature",
    name = "Open subtasks block even a forced completion"
)]
#[tokio::test(flavor = "multi_thread")]
async fn open_subtasks_block_forced_completion(world: CompletionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_completion.feature",
    name = "Finishing a dependency unblocks its dependent"
)]
#[tokio::test(flavor = "multi_thread")]
async fn finishing_dependency_unblocks_dependent(world: CompletionWorld) {
    let _ = world;
}
