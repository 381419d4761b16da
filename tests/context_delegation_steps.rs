//! Behaviour tests for upward context delegation.

#[path = "context_delegation_steps/mod.rs"]
mod context_delegation_steps_defs;

use context_delegation_steps_defs::world::{DelegationWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/context_delegation.feature",
    name = "Security findings are applied to the global context at once"
)]
#[tokio::test(flavor = "multi_thread")]
async fn security_findings_applied_at_once(world: DelegationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/context_delegation.feature",
    name = "Team conventions wait for review"
)]
#[tokio::test(flavor = "multi_thread")]
async fn team_conventions_wait_for_review(world: DelegationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/context_delegation.feature",
    name = "Approved delegations are merged into their target"
)]
#[tokio::test(flavor = "multi_thread")]
async fn approved_delegations_are_merged(world: DelegationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/context_delegation.feature",
    name = "Rejected delegations are never applied"
)]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_delegations_never_applied(world: DelegationWorld) {
    let _ = world;
}
