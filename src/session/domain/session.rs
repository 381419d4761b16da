//! Work session aggregate.
//!
//! A session pairs one agent with one task and keeps wall-clock
//! bookkeeping: paused time is tracked separately so that the active
//! duration excludes it. The aggregate is not synchronised; callers
//! serialise access per session through the repository.

use super::{SessionStatus, WorkSessionError, WorkSessionId};
use crate::task::domain::TaskId;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One entry of the append-only progress timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// When the update was recorded.
    pub recorded_at: DateTime<Utc>,
    /// What happened.
    pub message: String,
    /// Optional completion estimate.
    pub percentage: Option<u8>,
}

/// Agent work session on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSession {
    id: WorkSessionId,
    agent_id: String,
    task_id: TaskId,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    paused_secs: i64,
    max_duration_secs: Option<i64>,
    ended_at: Option<DateTime<Utc>>,
    locked_resources: BTreeSet<String>,
    progress: Vec<ProgressUpdate>,
    summary: Option<String>,
    cancel_reason: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedWorkSessionData {
    /// Persisted identifier.
    pub id: WorkSessionId,
    /// Persisted agent.
    pub agent_id: String,
    /// Persisted task.
    pub task_id: TaskId,
    /// Persisted status.
    pub status: SessionStatus,
    /// Persisted start timestamp.
    pub started_at: DateTime<Utc>,
    /// Start of the current pause, if paused.
    pub paused_at: Option<DateTime<Utc>>,
    /// Accumulated paused seconds of finished pauses.
    pub paused_secs: i64,
    /// Persisted maximum active duration in seconds.
    pub max_duration_secs: Option<i64>,
    /// Persisted end timestamp.
    pub ended_at: Option<DateTime<Utc>>,
    /// Persisted resource locks.
    pub locked_resources: BTreeSet<String>,
    /// Persisted progress timeline.
    pub progress: Vec<ProgressUpdate>,
    /// Persisted completion summary.
    pub summary: Option<String>,
    /// Persisted cancellation reason.
    pub cancel_reason: Option<String>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WorkSession {
    /// Starts an active session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::EmptyAgent`] for a blank agent and
    /// [`WorkSessionError::InvalidMaxDuration`] for a non-positive limit.
    pub fn start(
        agent_id: &str,
        task_id: TaskId,
        max_duration: Option<TimeDelta>,
        clock: &impl Clock,
    ) -> Result<Self, WorkSessionError> {
        let agent = agent_id.trim();
        if agent.is_empty() {
            return Err(WorkSessionError::EmptyAgent);
        }
        let max_duration_secs = max_duration.map(|limit| limit.num_seconds());
        if let Some(secs) = max_duration_secs.filter(|secs| *secs <= 0) {
            return Err(WorkSessionError::InvalidMaxDuration(secs));
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: WorkSessionId::new(),
            agent_id: agent.to_owned(),
            task_id,
            status: SessionStatus::Active,
            started_at: timestamp,
            paused_at: None,
            paused_secs: 0,
            max_duration_secs,
            ended_at: None,
            locked_resources: BTreeSet::new(),
            progress: Vec::new(),
            summary: None,
            cancel_reason: None,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a session from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedWorkSessionData) -> Self {
        Self {
            id: data.id,
            agent_id: data.agent_id,
            task_id: data.task_id,
            status: data.status,
            started_at: data.started_at,
            paused_at: data.paused_at,
            paused_secs: data.paused_secs,
            max_duration_secs: data.max_duration_secs,
            ended_at: data.ended_at,
            locked_resources: data.locked_resources,
            progress: data.progress,
            summary: data.summary,
            cancel_reason: data.cancel_reason,
            updated_at: data.updated_at,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> WorkSessionId {
        self.id
    }

    /// Returns the agent identifier.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the start of the current pause.
    #[must_use]
    pub const fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    /// Returns the seconds spent in finished pauses.
    #[must_use]
    pub const fn paused_secs(&self) -> i64 {
        self.paused_secs
    }

    /// Returns the maximum active duration in seconds.
    #[must_use]
    pub const fn max_duration_secs(&self) -> Option<i64> {
        self.max_duration_secs
    }

    /// Returns the end timestamp.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Returns the held resource locks.
    #[must_use]
    pub const fn locked_resources(&self) -> &BTreeSet<String> {
        &self.locked_resources
    }

    /// Returns the progress timeline, oldest first.
    #[must_use]
    pub fn progress(&self) -> &[ProgressUpdate] {
        &self.progress
    }

    /// Returns the completion summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the cancellation reason.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Suspends an active session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::InvalidTransition`] unless active.
    pub fn pause(&mut self, clock: &impl Clock) -> Result<(), WorkSessionError> {
        self.require(SessionStatus::Active, "pause")?;
        let now = clock.utc();
        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Resumes a paused session, adding the pause to the paused total.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::InvalidTransition`] unless paused.
    pub fn resume(&mut self, clock: &impl Clock) -> Result<(), WorkSessionError> {
        self.require(SessionStatus::Paused, "resume")?;
        let now = clock.utc();
        self.close_pause(now);
        self.status = SessionStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    /// Finishes the session normally and releases every lock.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::InvalidTransition`] once terminal.
    pub fn complete(
        &mut self,
        summary: Option<&str>,
        clock: &impl Clock,
    ) -> Result<(), WorkSessionError> {
        self.require_live("complete")?;
        self.summary = summary.map(str::to_owned);
        self.finish(SessionStatus::Completed, clock.utc());
        Ok(())
    }

    /// Abandons the session and releases every lock.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::InvalidTransition`] once terminal.
    pub fn cancel(
        &mut self,
        reason: Option<&str>,
        clock: &impl Clock,
    ) -> Result<(), WorkSessionError> {
        self.require_live("cancel")?;
        self.cancel_reason = reason.map(str::to_owned);
        self.finish(SessionStatus::Cancelled, clock.utc());
        Ok(())
    }

    /// Ends the session as timed out and releases every lock.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::InvalidTransition`] once terminal.
    pub fn mark_timeout(&mut self, clock: &impl Clock) -> Result<(), WorkSessionError> {
        self.require_live("time out")?;
        self.finish(SessionStatus::Timeout, clock.utc());
        Ok(())
    }

    /// Wall-clock time since the start, minus every pause.
    ///
    /// For ended sessions the end timestamp replaces the current time.
    #[must_use]
    pub fn active_duration(&self, clock: &impl Clock) -> TimeDelta {
        let end = self.ended_at.unwrap_or_else(|| clock.utc());
        let open_pause = self
            .paused_at
            .map_or(0, |since| end.signed_duration_since(since).num_seconds().max(0));
        let paused = self.paused_secs.saturating_add(open_pause);
        let elapsed = end.signed_duration_since(self.started_at).num_seconds();
        TimeDelta::try_seconds(elapsed.saturating_sub(paused).max(0)).unwrap_or(TimeDelta::MAX)
    }

    /// Returns `true` when a live session has exceeded its maximum active
    /// duration. Callers poll this; nothing fires on its own.
    #[must_use]
    pub fn is_timeout_due(&self, clock: &impl Clock) -> bool {
        self.status.is_live()
            && self
                .max_duration_secs
                .is_some_and(|max| self.active_duration(clock).num_seconds() > max)
    }

    /// Takes a lock on `resource`. Returns `false` when already held.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::EmptyResource`] for a blank name and
    /// [`WorkSessionError::InvalidTransition`] once terminal.
    pub fn lock_resource(
        &mut self,
        resource: &str,
        clock: &impl Clock,
    ) -> Result<bool, WorkSessionError> {
        self.require_live("lock resources in")?;
        let name = resource.trim();
        if name.is_empty() {
            return Err(WorkSessionError::EmptyResource);
        }
        let inserted = self.locked_resources.insert(name.to_owned());
        if inserted {
            self.updated_at = clock.utc();
        }
        Ok(inserted)
    }

    /// Releases a lock. Returns `true` when it was held.
    pub fn release_resource(&mut self, resource: &str, clock: &impl Clock) -> bool {
        let removed = self.locked_resources.remove(resource.trim());
        if removed {
            self.updated_at = clock.utc();
        }
        removed
    }

    /// Appends to the progress timeline.
    ///
    /// # Errors
    ///
    /// Returns [`WorkSessionError::EmptyProgressMessage`],
    /// [`WorkSessionError::InvalidProgress`] above 100, and
    /// [`WorkSessionError::InvalidTransition`] once terminal.
    pub fn record_progress(
        &mut self,
        message: &str,
        percentage: Option<u8>,
        clock: &impl Clock,
    ) -> Result<(), WorkSessionError> {
        self.require_live("record progress in")?;
        let text = message.trim();
        if text.is_empty() {
            return Err(WorkSessionError::EmptyProgressMessage);
        }
        if let Some(value) = percentage.filter(|value| *value > 100) {
            return Err(WorkSessionError::InvalidProgress(value));
        }
        let now = clock.utc();
        self.progress.push(ProgressUpdate {
            recorded_at: now,
            message: text.to_owned(),
            percentage,
        });
        self.updated_at = now;
        Ok(())
    }

    fn require(
        &self,
        expected: SessionStatus,
        action: &'static str,
    ) -> Result<(), WorkSessionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn require_live(&self, action: &'static str) -> Result<(), WorkSessionError> {
        if self.status.is_live() {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    const fn invalid(&self, action: &'static str) -> WorkSessionError {
        WorkSessionError::InvalidTransition {
            session_id: self.id,
            status: self.status,
            action,
        }
    }

    fn close_pause(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.paused_at.take() {
            let pause = now.signed_duration_since(since).num_seconds().max(0);
            self.paused_secs = self.paused_secs.saturating_add(pause);
        }
    }

    fn finish(&mut self, status: SessionStatus, now: DateTime<Utc>) {
        self.close_pause(now);
        self.status = status;
        self.ended_at = Some(now);
        self.locked_resources.clear();
        self.updated_at = now;
    }
}
