//! Completion email notifier.
//!
//! The email service is an external collaborator reached over HTTP; it owns
//! templates and delivery. The worker only posts the template variables.
//! Every caller treats send failures as best-effort: they are logged and
//! never fail the job.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use scall_models::Job;

use crate::error::{WorkerError, WorkerResult};

/// Template id the mail service renders for completed videos.
const COMPLETION_TEMPLATE: &str = "santa-video-ready";

/// Errors from the mail service call. Callers log these and move on.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Mail API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
}

/// Configuration for the mail service client.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Mail API endpoint
    pub api_url: String,
    /// Bearer token
    pub api_key: String,
    /// Sender address
    pub from: String,
}

impl NotifierConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Ok(Self {
            api_url: std::env::var("MAILER_API_URL")
                .map_err(|_| WorkerError::config("MAILER_API_URL not set"))?,
            api_key: std::env::var("MAILER_API_KEY")
                .map_err(|_| WorkerError::config("MAILER_API_KEY not set"))?,
            from: std::env::var("MAILER_FROM")
                .unwrap_or_else(|_| "Santa <santa@santacall.app>".to_string()),
        })
    }
}

/// Client for the transactional email service.
#[derive(Debug, Clone)]
pub struct Notifier {
    config: NotifierConfig,
    client: reqwest::Client,
}

impl Notifier {
    /// Create a notifier with the given configuration.
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Ok(Self::new(NotifierConfig::from_env()?))
    }

    /// Send the completion email for a rendered video.
    pub async fn send_completion(&self, job: &Job, video_url: &str) -> Result<(), NotifierError> {
        let payload = completion_payload(&self.config.from, job, video_url);
        debug!(job_id = %job.id, to = %job.recipient_email, "Sending completion email");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Api { status, body });
        }

        Ok(())
    }
}

/// Build the mail API payload for a completed render.
fn completion_payload(from: &str, job: &Job, video_url: &str) -> Value {
    json!({
        "from": from,
        "to": [job.recipient_email],
        "subject": format!("{}'s video call with Santa is ready", job.child_name),
        "template": COMPLETION_TEMPLATE,
        "variables": {
            "childName": job.child_name,
            "videoUrl": video_url,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job() -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            status: scall_models::JobStatus::Completed,
            retry_count: 0,
            recording_key: "recordings/call-1.mp3".to_string(),
            video_url: Some("https://media.santacall.app/videos/x.mp4".to_string()),
            notified_at: None,
            error_message: None,
            child_name: "Ella".to_string(),
            recipient_email: "parent@example.com".to_string(),
            claimed_at: None,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        }
    }

    #[test]
    fn test_completion_payload_fields() {
        let payload = completion_payload(
            "Santa <santa@santacall.app>",
            &job(),
            "https://media.santacall.app/videos/x.mp4",
        );

        assert_eq!(payload["to"][0], "parent@example.com");
        assert_eq!(payload["template"], "santa-video-ready");
        assert_eq!(payload["variables"]["childName"], "Ella");
        assert_eq!(
            payload["variables"]["videoUrl"],
            "https://media.santacall.app/videos/x.mp4"
        );
        assert!(payload["subject"].as_str().unwrap().contains("Ella"));
    }

    #[tokio::test]
    async fn test_send_completion_posts_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(NotifierConfig {
            api_url: format!("{}/emails", server.uri()),
            api_key: "test-key".to_string(),
            from: "Santa <santa@santacall.app>".to_string(),
        });

        notifier
            .send_completion(&job(), "https://media.santacall.app/videos/x.mp4")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_completion_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad recipient"))
            .mount(&server)
            .await;

        let notifier = Notifier::new(NotifierConfig {
            api_url: format!("{}/emails", server.uri()),
            api_key: "test-key".to_string(),
            from: "Santa <santa@santacall.app>".to_string(),
        });

        let err = notifier
            .send_completion(&job(), "https://media.santacall.app/videos/x.mp4")
            .await
            .unwrap_err();

        match err {
            NotifierError::Api { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad recipient");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
