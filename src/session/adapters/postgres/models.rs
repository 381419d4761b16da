//! Diesel row models for work session persistence.

use super::schema::work_sessions;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for work sessions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = work_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkSessionRow {
    /// Session identifier.
    pub id: uuid::Uuid,
    /// Agent identifier.
    pub agent_id: String,
    /// Task identifier.
    pub task_id: uuid::Uuid,
    /// Session status.
    pub status: String,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// Start of the current pause.
    pub paused_at: Option<DateTime<Utc>>,
    /// Seconds spent in finished pauses.
    pub paused_secs: i64,
    /// Maximum active duration in seconds.
    pub max_duration_secs: Option<i64>,
    /// End timestamp.
    pub ended_at: Option<DateTime<Utc>>,
    /// Resource locks JSON array.
    pub locked_resources: Value,
    /// Progress timeline JSON array.
    pub progress: Value,
    /// Completion summary.
    pub summary: Option<String>,
    /// Cancellation reason.
    pub cancel_reason: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and update model for work sessions.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = work_sessions)]
#[diesel(treat_none_as_null = true)]
pub struct NewWorkSessionRow {
    /// Session identifier.
    pub id: uuid::Uuid,
    /// Agent identifier.
    pub agent_id: String,
    /// Task identifier.
    pub task_id: uuid::Uuid,
    /// Session status.
    pub status: String,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// Start of the current pause.
    pub paused_at: Option<DateTime<Utc>>,
    /// Seconds spent in finished pauses.
    pub paused_secs: i64,
    /// Maximum active duration in seconds.
    pub max_duration_secs: Option<i64>,
    /// End timestamp.
    pub ended_at: Option<DateTime<Utc>>,
    /// Resource locks JSON array.
    pub locked_resources: Value,
    /// Progress timeline JSON array.
    pub progress: Value,
    /// Completion summary.
    pub summary: Option<String>,
    /// Cancellation reason.
    pub cancel_reason: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
