//! Per-job render pipeline.
//!
//! A deterministic sequence per claimed job: resolve a signed URL for the
//! recording, download it, estimate timing and waveform inputs, drive the
//! render engine, append the outro, publish the result, persist completion,
//! and send the gated notification. Each step's failure aborts the rest and
//! surfaces one descriptive error to the worker loop; nothing is rolled
//! back, because every step is an idempotent overwrite on retry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use scall_media::{append_outro, download_audio, estimate_render_inputs, EstimatorConfig, OutroConfig};
use scall_models::{event_type, Job};
use scall_render::{RenderComposition, Renderer};
use scall_storage::StorageClient;
use scall_store::JobStore;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::notifier::Notifier;

/// Validity of the signed recording URL; long enough to cover the render,
/// since the engine streams the audio itself.
const SIGNED_URL_TTL_SECS: u64 = 3_600;

/// Everything a pipeline run needs. Built once at startup and shared by
/// every job the loop claims.
pub struct PipelineContext {
    pub config: WorkerConfig,
    pub store: JobStore,
    pub storage: StorageClient,
    pub renderer: Renderer,
    pub outro: OutroConfig,
    pub notifier: Notifier,
    pub http: reqwest::Client,
}

impl PipelineContext {
    /// Assemble the context from environment configuration.
    pub fn new(config: WorkerConfig, store: JobStore) -> WorkerResult<Self> {
        let storage = StorageClient::from_env()
            .map_err(|e| WorkerError::config(e.to_string()))?;
        let renderer = Renderer::from_env()
            .map_err(|e| WorkerError::config(e.to_string()))?;
        let notifier = Notifier::from_env()?;

        Ok(Self {
            config,
            store,
            storage,
            renderer,
            outro: OutroConfig::from_env(),
            notifier,
            http: reqwest::Client::new(),
        })
    }

    fn estimator(&self) -> EstimatorConfig {
        EstimatorConfig {
            fps: self.config.fps,
            intro_seconds: self.config.intro_seconds,
        }
    }
}

/// Deterministic storage key for a job's rendered video.
///
/// Re-running the pipeline for the same job overwrites the same object,
/// which is what makes retries safe on the storage side.
pub fn video_object_key(job_id: Uuid) -> String {
    format!("videos/{}.mp4", job_id)
}

/// Seed for the synthetic waveform, folded from the job id so every
/// attempt of the same job renders from identical inputs.
fn amplitude_seed(job_id: Uuid) -> u64 {
    let bits = job_id.as_u128();
    (bits as u64) ^ ((bits >> 64) as u64)
}

/// Run the full render pipeline for a claimed job.
///
/// Returns the public video URL on success. The completed status is
/// persisted in here (not by the caller); the worker loop only decides
/// what to do on failure.
pub async fn run_job(ctx: &PipelineContext, job: &Job) -> WorkerResult<String> {
    let logger = JobLogger::new(job.id, "render_call_video");
    logger.log_start(&format!(
        "Rendering call video for {} (attempt {})",
        job.child_name,
        job.retry_count + 1
    ));

    ctx.store.mark_processing(job.id).await?;

    if let Err(e) = ctx
        .store
        .insert_event(
            job.id,
            event_type::RENDER_STARTED,
            json!({ "retry_count": job.retry_count }),
        )
        .await
    {
        warn!(job_id = %job.id, "Failed to append render_started event: {}", e);
    }

    let work_dir = PathBuf::from(&ctx.config.work_dir).join(job.id.to_string());
    tokio::fs::create_dir_all(&work_dir)
        .await
        .map_err(|e| WorkerError::unexpected(format!("cannot create work dir: {}", e)))?;

    let result = run_steps(ctx, job, &work_dir, &logger).await;

    cleanup_work_dir(&work_dir).await;

    match &result {
        Ok(url) => logger.log_completion(&format!("Video published at {}", url)),
        Err(e) => logger.log_error(&e.to_string()),
    }

    result
}

async fn run_steps(
    ctx: &PipelineContext,
    job: &Job,
    work_dir: &Path,
    logger: &JobLogger,
) -> WorkerResult<String> {
    // Resolve a time-limited signed URL for the recording
    let audio_url = ctx
        .storage
        .presign_get(&job.recording_key, Duration::from_secs(SIGNED_URL_TTL_SECS))
        .await
        .map_err(|e| WorkerError::audio_resolution(e.to_string()))?;

    // Download the payload; its size feeds the duration estimate
    let audio_path = work_dir.join("recording.mp3");
    let payload_bytes = download_audio(&ctx.http, &audio_url, &audio_path)
        .await
        .map_err(|e| WorkerError::download(e.to_string()))?;

    let inputs = estimate_render_inputs(payload_bytes, amplitude_seed(job.id), &ctx.estimator());
    logger.log_progress(&format!(
        "Estimated {}s video, {} frames",
        inputs.duration_seconds, inputs.total_frames
    ));

    // Drive the render engine
    let main_path = work_dir.join("main.mp4");
    let composition = RenderComposition::new(&inputs, ctx.config.fps, &audio_url, &job.child_name);
    let progress_job_id = job.id.to_string();
    ctx.renderer
        .render(&composition, &main_path, move |fraction| {
            debug!(job_id = %progress_job_id, "Render progress: {:.0}%", fraction * 100.0);
        })
        .await
        .map_err(|e| WorkerError::render_engine(e.to_string()))?;

    // Append the outro; failure in there falls back to the main video and
    // only the fallback copy itself can error
    let final_path = work_dir.join("final.mp4");
    append_outro(&main_path, &final_path, &ctx.outro)
        .await
        .map_err(|e| WorkerError::unexpected(format!("outro fallback failed: {}", e)))?;

    // Publish under the deterministic key
    let key = video_object_key(job.id);
    ctx.storage
        .upload_file(&final_path, &key, "video/mp4")
        .await
        .map_err(|e| WorkerError::upload(e.to_string()))?;

    let video_url = ctx.storage.public_url(&key);

    // Persist completion; this is the pipeline's final fatal step
    ctx.store.mark_completed(job.id, &video_url).await?;

    if let Err(e) = ctx
        .store
        .insert_event(
            job.id,
            event_type::RENDER_COMPLETED,
            json!({
                "video_url": video_url,
                "duration_seconds": inputs.duration_seconds,
                "retry_count": job.retry_count,
            }),
        )
        .await
    {
        warn!(job_id = %job.id, "Failed to append render_completed event: {}", e);
    }

    notify_if_needed(ctx, job.id, &video_url).await;

    Ok(video_url)
}

/// Send the completion email at most once per job.
///
/// The job is re-fetched so a stale in-memory record cannot produce a
/// false "not yet notified", and the flag is taken with a NULL-guarded
/// conditional update before sending. Everything in here is best-effort:
/// the video is already published and completed.
async fn notify_if_needed(ctx: &PipelineContext, job_id: Uuid, video_url: &str) {
    let job = match ctx.store.get(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(job_id = %job_id, "Job vanished before notification");
            return;
        }
        Err(e) => {
            warn!(job_id = %job_id, "Could not re-fetch job for notification: {}", e);
            return;
        }
    };

    if !job.needs_notification() {
        debug!(job_id = %job_id, "Completion email already sent, skipping");
        return;
    }

    match ctx.store.try_mark_notified(job_id).await {
        Ok(true) => {
            if let Err(e) = ctx.notifier.send_completion(&job, video_url).await {
                warn!(job_id = %job_id, "Completion email failed (best-effort): {}", e);
                return;
            }
            if let Err(e) = ctx
                .store
                .insert_event(
                    job_id,
                    event_type::COMPLETION_EMAIL_SENT,
                    json!({ "recipient": job.recipient_email }),
                )
                .await
            {
                warn!(job_id = %job_id, "Failed to append notification event: {}", e);
            }
        }
        Ok(false) => {
            debug!(job_id = %job_id, "Another completion already took the notification");
        }
        Err(e) => {
            warn!(job_id = %job_id, "Could not take notification flag: {}", e);
        }
    }
}

/// Delete the job's temporary files. Failures are logged, never escalated.
async fn cleanup_work_dir(work_dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(work_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to clean up {}: {}", work_dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_object_key_is_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(video_object_key(id), video_object_key(id));
        assert_eq!(video_object_key(id), format!("videos/{}.mp4", id));
    }

    #[test]
    fn test_amplitude_seed_stable_per_job() {
        let id = Uuid::new_v4();
        assert_eq!(amplitude_seed(id), amplitude_seed(id));
        assert_ne!(amplitude_seed(id), amplitude_seed(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_cleanup_work_dir_removes_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let work_dir = dir.path().join("job-1");
        tokio::fs::create_dir_all(&work_dir).await.unwrap();
        tokio::fs::write(work_dir.join("recording.mp3"), b"audio")
            .await
            .unwrap();

        cleanup_work_dir(&work_dir).await;
        assert!(!work_dir.exists());

        // missing dir is fine
        cleanup_work_dir(&work_dir).await;
    }
}
