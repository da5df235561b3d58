//! Metric name and label definitions.
//!
//! Every metric the workspace records is named here so the full set is
//! documented in one place.

/// Envelope listener metrics
pub mod listener {
    /// Envelopes taken off the channel, by kind
    pub const ENVELOPES_RECEIVED_TOTAL: &str = "msghub_listener_envelopes_received_total";
    /// Envelopes whose receiver group failed, by kind
    pub const ENVELOPE_FAILURES_TOTAL: &str = "msghub_listener_envelope_failures_total";
    /// Commands skipped because they were not pending
    pub const COMMANDS_IGNORED_TOTAL: &str = "msghub_listener_commands_ignored_total";
    /// Time spent processing one envelope, in seconds
    pub const PROCESSING_DURATION_SECONDS: &str = "msghub_listener_processing_duration_seconds";
    /// Envelopes currently being processed
    pub const IN_FLIGHT: &str = "msghub_listener_envelopes_in_flight";
}

/// Acknowledgment and failure feedback metrics
pub mod feedback {
    /// Notifications sent back for received messages, by event
    pub const NOTIFICATIONS_SENT_TOTAL: &str = "msghub_feedback_notifications_sent_total";
    /// Failure responses sent for pending commands
    pub const COMMAND_FAILURES_SENT_TOTAL: &str = "msghub_feedback_command_failures_sent_total";
    /// Feedback sends that themselves failed
    pub const SEND_ERRORS_TOTAL: &str = "msghub_feedback_send_errors_total";
}

/// Common label keys
pub mod labels {
    pub const KIND: &str = "kind";
    pub const EVENT: &str = "event";
    pub const REASON_CODE: &str = "reason_code";
}
