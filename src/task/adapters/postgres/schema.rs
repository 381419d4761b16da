//! Diesel schema for task persistence.

diesel::table! {
    /// Task aggregates.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Title.
        #[max_length = 200]
        title -> Varchar,
        /// Description.
        description -> Text,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Priority.
        #[max_length = 50]
        priority -> Varchar,
        /// Assignee identifiers as a JSON array.
        assignees -> Jsonb,
        /// Labels as a JSON array.
        labels -> Jsonb,
        /// Dependency task identifiers as a JSON array.
        dependencies -> Jsonb,
        /// Effort estimate.
        #[max_length = 100]
        estimated_effort -> Nullable<Varchar>,
        /// Due date.
        due_date -> Nullable<Timestamptz>,
        /// Owning project.
        project_id -> Nullable<Uuid>,
        /// Owning branch.
        branch_id -> Nullable<Uuid>,
        /// Linked task context.
        context_id -> Nullable<Uuid>,
        /// Completion summary.
        completion_summary -> Nullable<Text>,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Subtasks owned by a task.
    subtasks (id) {
        /// Subtask identifier.
        id -> Uuid,
        /// Parent task identifier.
        parent_task_id -> Uuid,
        /// Title.
        #[max_length = 200]
        title -> Varchar,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Progress percentage (0-100).
        progress_percentage -> Int2,
        /// Assignee identifiers as a JSON array.
        assignees -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only task event log.
    task_events (event_id) {
        /// Event identifier.
        event_id -> Uuid,
        /// Task the event concerns.
        task_id -> Uuid,
        /// Event kind.
        #[max_length = 50]
        kind -> Varchar,
        /// Structured metadata.
        metadata -> Jsonb,
        /// Occurrence timestamp.
        occurred_at -> Timestamptz,
    }
}

diesel::joinable!(subtasks -> tasks (parent_task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, subtasks, task_events);
