//! Append-only audit log entries for render jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event types appended by the worker.
///
/// The log is written-only: nothing reads it back except support tooling,
/// so new types can be added freely.
pub mod event_type {
    /// A claimed job entered the render pipeline.
    pub const RENDER_STARTED: &str = "render_started";
    /// A failed attempt was sent back to the pending pool.
    pub const RETRY_SCHEDULED: &str = "retry_scheduled";
    /// Retries exhausted; the job will not be attempted again.
    pub const RENDER_FAILED_PERMANENTLY: &str = "render_failed_permanently";
    /// The video was rendered, published, and recorded on the job.
    pub const RENDER_COMPLETED: &str = "render_completed";
    /// The completion email was handed to the mail service.
    pub const COMPLETION_EMAIL_SENT: &str = "completion_email_sent";
}

/// One audit log entry. Rows are inserted and never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// Log sequence id
    pub id: i64,

    /// Job this event belongs to
    pub job_id: Uuid,

    /// One of the `event_type` constants
    pub event_type: String,

    /// Free-form structured payload
    pub event_data: serde_json::Value,

    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serde() {
        let event = JobEvent {
            id: 7,
            job_id: Uuid::new_v4(),
            event_type: event_type::RETRY_SCHEDULED.to_string(),
            event_data: json!({"retry_count": 1, "backoff_ms": 30_000}),
            created_at: Utc::now(),
        };

        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: JobEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.event_type, "retry_scheduled");
        assert_eq!(decoded.event_data["backoff_ms"], 30_000);
    }
}
