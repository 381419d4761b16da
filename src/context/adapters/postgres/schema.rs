//! Diesel schema for context and delegation persistence.

diesel::table! {
    /// Context records keyed by level and identifier.
    contexts (level, id) {
        /// Hierarchy level.
        #[max_length = 20]
        level -> Varchar,
        /// Context identifier.
        id -> Uuid,
        /// Parent level.
        #[max_length = 20]
        parent_level -> Nullable<Varchar>,
        /// Parent identifier.
        parent_id -> Nullable<Uuid>,
        /// Payload owned by this level.
        data -> Jsonb,
        /// Version counter.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Upward delegation requests and their review state.
    delegations (id) {
        /// Delegation identifier.
        id -> Uuid,
        /// Source level.
        #[max_length = 20]
        source_level -> Varchar,
        /// Source context identifier.
        source_id -> Uuid,
        /// Target level.
        #[max_length = 20]
        target_level -> Varchar,
        /// Target context identifier.
        target_id -> Uuid,
        /// Payload to merge.
        delegated_data -> Jsonb,
        /// Justification.
        reason -> Text,
        /// What raised the request.
        #[max_length = 20]
        trigger_type -> Varchar,
        /// Caller-supplied confidence.
        confidence_score -> Nullable<Float8>,
        /// Impact assessment.
        impact -> Nullable<Jsonb>,
        /// Review status.
        #[max_length = 20]
        status -> Varchar,
        /// Whether approval was automatic.
        auto_approved -> Bool,
        /// Reviewer identifier.
        #[max_length = 255]
        reviewed_by -> Nullable<Varchar>,
        /// Rejection reason.
        rejection_reason -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Review timestamp.
        reviewed_at -> Nullable<Timestamptz>,
    }
}
