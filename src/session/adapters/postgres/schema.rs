//! Diesel schema for work session persistence.

diesel::table! {
    /// Agent work sessions.
    work_sessions (id) {
        /// Session identifier.
        id -> Uuid,
        /// Agent working the task.
        #[max_length = 255]
        agent_id -> Varchar,
        /// Task being worked.
        task_id -> Uuid,
        /// Session status.
        #[max_length = 50]
        status -> Varchar,
        /// Start timestamp.
        started_at -> Timestamptz,
        /// Start of the current pause.
        paused_at -> Nullable<Timestamptz>,
        /// Seconds spent in finished pauses.
        paused_secs -> Int8,
        /// Maximum active duration in seconds.
        max_duration_secs -> Nullable<Int8>,
        /// End timestamp.
        ended_at -> Nullable<Timestamptz>,
        /// Held resource locks as a JSON array.
        locked_resources -> Jsonb,
        /// Progress timeline as a JSON array.
        progress -> Jsonb,
        /// Completion summary.
        summary -> Nullable<Text>,
        /// Cancellation reason.
        cancel_reason -> Nullable<Text>,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
