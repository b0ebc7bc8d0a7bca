//! Render job record and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Status of a render job.
///
/// Transitions are one-directional except `Processing -> Pending` (retry)
/// and `Pending -> Processing` (claim).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed by a worker
    #[default]
    Pending,
    /// Claimed and actively rendering
    Processing,
    /// Video rendered and published
    Completed,
    /// Permanently failed after exhausting retries
    Failed,
}

impl JobStatus {
    /// Get string representation of the status (matches the DB column).
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Error)]
#[error("unknown job status: {0}")]
pub struct UnknownStatusError(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownStatusError(other.to_string())),
        }
    }
}

/// One video-render task tied to a completed phone call's recording.
///
/// The row is owned by the web application's database; the worker reads it
/// and performs status-guarded conditional updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Primary key of the underlying call record
    pub id: Uuid,

    /// Current status
    pub status: JobStatus,

    /// Number of failed attempts so far
    pub retry_count: i32,

    /// Object-storage key of the source call recording
    pub recording_key: String,

    /// Durable public URL of the rendered video, present iff completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Set once a completion email has been sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,

    /// Last failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Child's name, rendered into the video
    pub child_name: String,

    /// Parent email for the completion notification
    pub recipient_email: String,

    /// When the current claim was taken (lease bookkeeping)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,

    /// Creation timestamp (claim order is oldest-first on this)
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Completion timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Check whether this job is eligible for claiming.
    ///
    /// Mirrors the claim query: pending with a non-empty recording key.
    pub fn is_eligible(&self) -> bool {
        self.status == JobStatus::Pending && !self.recording_key.is_empty()
    }

    /// Check if a completion notification may still be sent.
    pub fn needs_notification(&self) -> bool {
        self.notified_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: JobStatus, recording_key: &str) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            status,
            retry_count: 0,
            recording_key: recording_key.to_string(),
            video_url: None,
            notified_at: None,
            error_message: None,
            child_name: "Noah".to_string(),
            recipient_email: "parent@example.com".to_string(),
            claimed_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("stuck".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_eligibility() {
        assert!(job(JobStatus::Pending, "recordings/abc.mp3").is_eligible());
        assert!(!job(JobStatus::Pending, "").is_eligible());
        assert!(!job(JobStatus::Processing, "recordings/abc.mp3").is_eligible());
    }

    #[test]
    fn test_needs_notification() {
        let mut j = job(JobStatus::Completed, "recordings/abc.mp3");
        assert!(j.needs_notification());
        j.notified_at = Some(Utc::now());
        assert!(!j.needs_notification());
    }
}
