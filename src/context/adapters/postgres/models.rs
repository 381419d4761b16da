//! Diesel row models for context and delegation persistence.

use super::schema::{contexts, delegations};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for contexts.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = contexts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContextRow {
    /// Hierarchy level.
    pub level: String,
    /// Context identifier.
    pub id: uuid::Uuid,
    /// Parent level.
    pub parent_level: Option<String>,
    /// Parent identifier.
    pub parent_id: Option<uuid::Uuid>,
    /// Payload.
    pub data: Value,
    /// Version counter.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and update model for contexts.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = contexts)]
#[diesel(primary_key(level, id))]
#[diesel(treat_none_as_null = true)]
pub struct NewContextRow {
    /// Hierarchy level.
    pub level: String,
    /// Context identifier.
    pub id: uuid::Uuid,
    /// Parent level.
    pub parent_level: Option<String>,
    /// Parent identifier.
    pub parent_id: Option<uuid::Uuid>,
    /// Payload.
    pub data: Value,
    /// Version counter.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for delegations.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = delegations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DelegationRow {
    /// Delegation identifier.
    pub id: uuid::Uuid,
    /// Source level.
    pub source_level: String,
    /// Source context identifier.
    pub source_id: uuid::Uuid,
    /// Target level.
    pub target_level: String,
    /// Target context identifier.
    pub target_id: uuid::Uuid,
    /// Payload.
    pub delegated_data: Value,
    /// Justification.
    pub reason: String,
    /// Trigger type.
    pub trigger_type: String,
    /// Caller confidence.
    pub confidence_score: Option<f64>,
    /// Impact assessment.
    pub impact: Option<Value>,
    /// Review status.
    pub status: String,
    /// Whether approval was automatic.
    pub auto_approved: bool,
    /// Reviewer identifier.
    pub reviewed_by: Option<String>,
    /// Rejection reason.
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Review timestamp.
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Insert and update model for delegations.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = delegations)]
#[diesel(treat_none_as_null = true)]
pub struct NewDelegationRow {
    /// Delegation identifier.
    pub id: uuid::Uuid,
    /// Source level.
    pub source_level: String,
    /// Source context identifier.
    pub source_id: uuid::Uuid,
    /// Target level.
    pub target_level: String,
    /// Target context identifier.
    pub target_id: uuid::Uuid,
    /// Payload.
    pub delegated_data: Value,
    /// Justification.
    pub reason: String,
    /// Trigger type.
    pub trigger_type: String,
    /// Caller confidence.
    pub confidence_score: Option<f64>,
    /// Impact assessment.
    pub impact: Option<Value>,
    /// Review status.
    pub status: String,
    /// Whether approval was automatic.
    pub auto_approved: bool,
    /// Reviewer identifier.
    pub reviewed_by: Option<String>,
    /// Rejection reason.
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Review timestamp.
    pub reviewed_at: Option<DateTime<Utc>>,
}
