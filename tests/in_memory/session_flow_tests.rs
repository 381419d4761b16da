//! Work sessions driven through the service container.

use std::sync::Arc;

use super::helpers::{ManualClock, TestContext, services};
use chrono::TimeDelta;
use eyre::ensure;
use rstest::rstest;
use stratum::session::domain::SessionStatus;
use stratum::task::domain::TaskDraft;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn paused_time_does_not_count_towards_the_timeout(
    services: (TestContext, Arc<ManualClock>),
) -> eyre::Result<()> {
    let (ctx, clock) = services;
    let task = ctx
        .task_lifecycle()
        .create_task(TaskDraft::new("Migrate billing tables"))
        .await?;
    let sessions = ctx.sessions();
    let session = sessions
        .start_session("agent-3", task.id(), Some(TimeDelta::minutes(60)))
        .await?;
    ensure!(
        sessions.lock_resource(session.id(), "db/billing").await?,
        "lock acquired"
    );

    clock.advance_minutes(40);
    sessions.pause_session(session.id()).await?;
    clock.advance_minutes(90);
    sessions.resume_session(session.id()).await?;
    ensure!(
        sessions.expire_overdue_sessions().await?.is_empty(),
        "only forty active minutes so far"
    );

    clock.advance_minutes(25);
    let expired = sessions.expire_overdue_sessions().await?;
    ensure!(expired == vec![session.id()], "session expired after sixty five active minutes");

    let stored = sessions
        .find_session(session.id())
        .await?
        .ok_or_else(|| eyre::eyre!("session missing"))?;
    ensure!(stored.status() == SessionStatus::Timeout, "timed out");
    ensure!(stored.locked_resources().is_empty(), "locks released on expiry");
    ensure!(
        sessions.live_session_for_task(task.id()).await?.is_none(),
        "task is free again"
    );

    let next = sessions.start_session("agent-4", task.id(), None).await?;
    ensure!(next.status() == SessionStatus::Active, "new session can start");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_sessions_keep_their_timeline(
    services: (TestContext, Arc<ManualClock>),
) -> eyre::Result<()> {
    let (ctx, clock) = services;
    let task = ctx
        .task_lifecycle()
        .create_task(TaskDraft::new("Document retry policy"))
        .await?;
    let sessions = ctx.sessions();
    let session = sessions.start_session("agent-5", task.id(), None).await?;

    sessions
        .record_progress(session.id(), "outlined sections", Some(30))
        .await?;
    clock.advance_minutes(15);
    sessions
        .record_progress(session.id(), "drafted examples", Some(80))
        .await?;
    let done = sessions
        .complete_session(session.id(), Some("policy documented"))
        .await?;

    ensure!(done.status() == SessionStatus::Completed, "completed");
    ensure!(done.summary() == Some("policy documented"), "summary kept");
    let messages: Vec<&str> = done
        .progress()
        .iter()
        .map(|update| update.message.as_str())
        .collect();
    ensure!(
        messages == vec!["outlined sections", "drafted examples"],
        "timeline in order: {messages:?}"
    );
    ensure!(
        sessions.expire_overdue_sessions().await?.is_empty(),
        "ended sessions never expire"
    );
    Ok(())
}
