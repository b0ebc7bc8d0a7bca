//! Worker loop.
//!
//! Single-process scheduler: claim the oldest pending job, run the render
//! pipeline for it, decide retry or permanent failure, repeat. One job is
//! in flight at a time; the claim's conditional update is the only
//! concurrency-control primitive in the system.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use scall_models::{event_type, Job};

use crate::config::{advisory_backoff_ms, WorkerConfig};
use crate::error::WorkerResult;
use crate::pipeline::{self, PipelineContext};

/// What to do with a job after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back to the pending pool, claimable immediately.
    Retry { retry_count: i32, backoff_ms: u64 },
    /// Retries exhausted; fail for good.
    Permanent { retry_count: i32 },
}

impl RetryDecision {
    /// Decide from the retry count observed at claim time.
    pub fn next(prior_retry_count: i32, max_retries: i32) -> Self {
        let retry_count = prior_retry_count + 1;
        if retry_count >= max_retries {
            RetryDecision::Permanent { retry_count }
        } else {
            RetryDecision::Retry {
                retry_count,
                backoff_ms: advisory_backoff_ms(retry_count),
            }
        }
    }
}

/// Job executor polling the store for render jobs.
pub struct JobExecutor {
    config: WorkerConfig,
    ctx: Arc<PipelineContext>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    /// Create a new executor.
    pub fn new(config: WorkerConfig, ctx: PipelineContext) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            ctx: Arc::new(ctx),
            shutdown,
        }
    }

    /// Signal shutdown: stop claiming, drain the in-flight job.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run the claim/render loop until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting render worker (poll {:?}, max retries {})",
            self.config.poll_interval, self.config.max_retries
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            // Claim errors are not fatal: log and try again next cycle
            let claimed = match self.ctx.store.claim_next_job(self.config.claim_lease_secs).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    warn!("Claim failed, treating as no job this cycle: {}", e);
                    None
                }
            };

            let Some(job) = claimed else {
                tokio::select! {
                    _ = shutdown_rx.changed() => {}
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
                continue;
            };

            self.execute_claimed(job, &mut shutdown_rx).await;
        }

        info!("Worker loop stopped");
        Ok(())
    }

    /// Run one claimed job, honoring the shutdown drain window.
    async fn execute_claimed(&self, job: Job, shutdown_rx: &mut watch::Receiver<bool>) {
        let job_id = job.id;
        let retry_count = job.retry_count;
        info!(job_id = %job_id, retry_count, "Claimed render job");

        // Spawned so a panic inside the pipeline is contained at the join
        // boundary instead of taking the loop down.
        let ctx = Arc::clone(&self.ctx);
        let mut handle: JoinHandle<WorkerResult<String>> =
            tokio::spawn(async move { pipeline::run_job(&ctx, &job).await });

        let join_result = tokio::select! {
            res = &mut handle => res,
            _ = shutdown_rx.changed() => {
                info!(
                    job_id = %job_id,
                    "Shutdown requested, draining in-flight job for up to {:?}",
                    self.config.shutdown_timeout
                );
                match tokio::time::timeout(self.config.shutdown_timeout, &mut handle).await {
                    Ok(res) => res,
                    Err(_) => {
                        warn!(
                            job_id = %job_id,
                            "Drain window exceeded; exiting with the job still marked processing"
                        );
                        handle.abort();
                        return;
                    }
                }
            }
        };

        match join_result {
            Ok(Ok(video_url)) => {
                info!(job_id = %job_id, "Render job finished: {}", video_url);
            }
            Ok(Err(e)) => {
                self.handle_failure(job_id, &e.to_string(), retry_count).await;
            }
            Err(join_err) => {
                let message = format!("unexpected worker error: {}", join_err);
                error!(job_id = %job_id, "{}", message);
                self.handle_failure(job_id, &message, retry_count).await;
                // Keep a crashing job from turning into a tight loop
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
    }

    /// Apply the retry bound and persist the outcome of a failed attempt.
    async fn handle_failure(&self, job_id: Uuid, error_message: &str, prior_retry_count: i32) {
        match RetryDecision::next(prior_retry_count, self.config.max_retries) {
            RetryDecision::Permanent { retry_count } => {
                error!(
                    job_id = %job_id,
                    "Render failed permanently after {} attempts: {}",
                    retry_count, error_message
                );
                if let Err(e) = self
                    .ctx
                    .store
                    .mark_failed_permanently(job_id, retry_count, error_message)
                    .await
                {
                    error!(job_id = %job_id, "Could not persist permanent failure: {}", e);
                    return;
                }
                if let Err(e) = self
                    .ctx
                    .store
                    .insert_event(
                        job_id,
                        event_type::RENDER_FAILED_PERMANENTLY,
                        json!({ "error": error_message, "retry_count": retry_count }),
                    )
                    .await
                {
                    warn!(job_id = %job_id, "Failed to append failure event: {}", e);
                }
            }
            RetryDecision::Retry {
                retry_count,
                backoff_ms,
            } => {
                warn!(
                    job_id = %job_id,
                    "Attempt {} failed, rescheduling (advisory backoff {}ms): {}",
                    retry_count, backoff_ms, error_message
                );
                if let Err(e) = self
                    .ctx
                    .store
                    .schedule_retry(job_id, retry_count, error_message)
                    .await
                {
                    error!(job_id = %job_id, "Could not reschedule job: {}", e);
                    return;
                }
                if let Err(e) = self
                    .ctx
                    .store
                    .insert_event(
                        job_id,
                        event_type::RETRY_SCHEDULED,
                        json!({
                            "error": error_message,
                            "retry_count": retry_count,
                            "backoff_ms": backoff_ms,
                        }),
                    )
                    .await
                {
                    warn!(job_id = %job_id, "Failed to append retry event: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_decision_bounds() {
        // attempts 1 and 2 go back to pending
        assert_eq!(
            RetryDecision::next(0, 3),
            RetryDecision::Retry {
                retry_count: 1,
                backoff_ms: 30_000
            }
        );
        assert_eq!(
            RetryDecision::next(1, 3),
            RetryDecision::Retry {
                retry_count: 2,
                backoff_ms: 120_000
            }
        );
        // the third failure is permanent with retry_count == max
        assert_eq!(
            RetryDecision::next(2, 3),
            RetryDecision::Permanent { retry_count: 3 }
        );
        // counts past the max stay permanent
        assert_eq!(
            RetryDecision::next(5, 3),
            RetryDecision::Permanent { retry_count: 6 }
        );
    }

    #[test]
    fn test_retry_decision_advisory_delays() {
        let delays: Vec<u64> = (0..2)
            .map(|prior| match RetryDecision::next(prior, 3) {
                RetryDecision::Retry { backoff_ms, .. } => backoff_ms,
                RetryDecision::Permanent { .. } => panic!("unexpected permanent"),
            })
            .collect();
        assert_eq!(delays, vec![30_000, 120_000]);
    }
}
