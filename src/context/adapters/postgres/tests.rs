//! Row conversion tests for the context `PostgreSQL` adapter.

use super::models::{ContextRow, DelegationRow, NewContextRow, NewDelegationRow};
use super::repository::{row_to_context, row_to_delegation, to_context_row, to_delegation_row};
use crate::context::domain::{
    Context, ContextId, ContextLevel, ContextRef, Delegation, DelegationRequest,
    DelegationTrigger, ImpactAssessment, Recommendation,
};
use crate::task::domain::{BranchId, ProjectId};
use crate::test_support::FixedClock;
use rstest::{fixture, rstest};
use serde_json::{Map, Value, json};

fn read_back(row: NewContextRow) -> ContextRow {
    ContextRow {
        level: row.level,
        id: row.id,
        parent_level: row.parent_level,
        parent_id: row.parent_id,
        data: row.data,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn read_back_delegation(row: NewDelegationRow) -> DelegationRow {
    DelegationRow {
        id: row.id,
        source_level: row.source_level,
        source_id: row.source_id,
        target_level: row.target_level,
        target_id: row.target_id,
        delegated_data: row.delegated_data,
        reason: row.reason,
        trigger_type: row.trigger_type,
        confidence_score: row.confidence_score,
        impact: row.impact,
        status: row.status,
        auto_approved: row.auto_approved,
        reviewed_by: row.reviewed_by,
        rejection_reason: row.rejection_reason,
        created_at: row.created_at,
        reviewed_at: row.reviewed_at,
    }
}

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[fixture]
fn clock() -> FixedClock {
    FixedClock::start()
}

#[rstest]
fn branch_context_round_trips(clock: FixedClock) {
    let parent = ContextRef::new(ContextLevel::Project, ProjectId::new().into());
    let mut context = Context::new(
        ContextLevel::Branch,
        BranchId::new().into(),
        Some(parent),
        payload(json!({"conventions": {"commits": "conventional"}})),
        &clock,
    )
    .expect("valid branch context");
    context.merge(&payload(json!({"owner": "platform"})), &clock);

    let row = to_context_row(&context).expect("encode context");
    assert_eq!(row.level, "branch");
    assert_eq!(row.parent_level.as_deref(), Some("project"));
    assert_eq!(row.version, 2);

    let restored = row_to_context(read_back(row)).expect("decode context");
    assert_eq!(restored, context);
}

#[rstest]
fn global_context_has_no_parent_columns(clock: FixedClock) {
    let context = Context::global(Map::new(), &clock);

    let row = to_context_row(&context).expect("encode context");

    assert_eq!(row.id, ContextId::GLOBAL.into_inner());
    assert!(row.parent_level.is_none());
    assert!(row.parent_id.is_none());
}

#[rstest]
fn non_object_payload_decodes_as_empty(clock: FixedClock) {
    let context = Context::global(Map::new(), &clock);
    let mut row = read_back(to_context_row(&context).expect("encode context"));
    row.data = json!(["unexpected"]);

    let restored = row_to_context(row).expect("decode context");

    assert!(restored.data().is_empty());
}

#[rstest]
fn unknown_level_is_rejected(clock: FixedClock) {
    let context = Context::global(Map::new(), &clock);
    let mut row = read_back(to_context_row(&context).expect("encode context"));
    row.level = "workspace".to_owned();

    assert!(row_to_context(row).is_err());
}

#[rstest]
fn reviewed_delegation_round_trips(clock: FixedClock) {
    let source: ContextId = ProjectId::new().into();
    let request = DelegationRequest::new(
        ContextLevel::Project,
        source,
        ContextLevel::Global,
        payload(json!({"security": {"rule": "rotate keys"}})),
        "applies everywhere",
    )
    .with_trigger(DelegationTrigger::AutoPattern)
    .with_confidence(0.5);
    let mut delegation = Delegation::new(request, ContextId::GLOBAL, &clock);
    delegation.record_impact(ImpactAssessment {
        score: 0.5,
        confidence: 0.5,
        recommendation: Recommendation::ManualReview,
        matched_patterns: vec!["security".to_owned()],
        risk_factors: vec!["global target".to_owned()],
    });
    delegation
        .reject("reviewer-1", Some("too broad"), &clock)
        .expect("pending delegation");

    let row = to_delegation_row(&delegation).expect("encode delegation");
    assert_eq!(row.trigger_type, "auto_pattern");
    assert_eq!(row.status, "rejected");

    let restored = row_to_delegation(read_back_delegation(row)).expect("decode delegation");
    assert_eq!(restored, delegation);
}

#[rstest]
fn unknown_delegation_status_is_rejected(clock: FixedClock) {
    let request = DelegationRequest::new(
        ContextLevel::Task,
        ProjectId::new().into(),
        ContextLevel::Branch,
        payload(json!({"note": "x"})),
        "",
    );
    let delegation = Delegation::new(request, BranchId::new().into(), &clock);
    let mut row = read_back_delegation(to_delegation_row(&delegation).expect("encode"));
    row.status = "escalated".to_owned();

    assert!(row_to_delegation(row).is_err());
}
