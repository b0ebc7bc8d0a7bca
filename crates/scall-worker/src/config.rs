//! Worker configuration.

use std::time::Duration;

/// Advisory backoff delays per attempt, in milliseconds.
///
/// A failed job becomes claimable again immediately; these delays are
/// logged and recorded in the `retry_scheduled` event, never enforced.
pub const BACKOFF_DELAYS_MS: [u64; 3] = [30_000, 120_000, 600_000];

/// Advisory backoff for a given attempt number (1-based); attempts past
/// the table reuse the last entry.
pub fn advisory_backoff_ms(attempt: i32) -> u64 {
    let index = (attempt.max(1) as usize - 1).min(BACKOFF_DELAYS_MS.len() - 1);
    BACKOFF_DELAYS_MS[index]
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between empty claim cycles
    pub poll_interval: Duration,
    /// Attempts before a job is failed permanently
    pub max_retries: i32,
    /// How long a shutdown waits for the in-flight job
    pub shutdown_timeout: Duration,
    /// Reclaim lease for orphaned `processing` jobs; 0 disables reclaim
    pub claim_lease_secs: u64,
    /// Work directory for temporary files
    pub work_dir: String,
    /// Output frame rate
    pub fps: u32,
    /// Fixed intro length in seconds
    pub intro_seconds: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5_000),
            max_retries: 3,
            shutdown_timeout: Duration::from_secs(300),
            claim_lease_secs: 0,
            work_dir: "/tmp/santacall".to_string(),
            fps: 60,
            intro_seconds: 2,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(
                std::env::var("WORKER_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5_000),
            ),
            max_retries: std::env::var("WORKER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            claim_lease_secs: std::env::var("WORKER_CLAIM_LEASE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/santacall".to_string()),
            fps: std::env::var("VIDEO_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            intro_seconds: std::env::var("VIDEO_INTRO_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(5_000));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(300));
        assert_eq!(config.claim_lease_secs, 0);
        assert_eq!(config.fps, 60);
        assert_eq!(config.intro_seconds, 2);
    }

    #[test]
    fn test_advisory_backoff_table() {
        assert_eq!(advisory_backoff_ms(1), 30_000);
        assert_eq!(advisory_backoff_ms(2), 120_000);
        assert_eq!(advisory_backoff_ms(3), 600_000);
        // past the table, reuse the last entry
        assert_eq!(advisory_backoff_ms(7), 600_000);
        // attempt numbers below 1 clamp to the first entry
        assert_eq!(advisory_backoff_ms(0), 30_000);
    }
}
