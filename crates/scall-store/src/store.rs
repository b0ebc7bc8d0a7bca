//! Job store queries.
//!
//! The `render_jobs` and `render_job_events` tables are owned by the web
//! application; this module holds the handful of queries the worker needs.
//! Expected shape:
//!
//! ```sql
//! CREATE TABLE render_jobs (
//!     id              UUID PRIMARY KEY,
//!     status          TEXT NOT NULL DEFAULT 'pending',
//!     retry_count     INT NOT NULL DEFAULT 0,
//!     recording_key   TEXT NOT NULL,
//!     video_url       TEXT,
//!     notified_at     TIMESTAMPTZ,
//!     error_message   TEXT,
//!     child_name      TEXT NOT NULL,
//!     recipient_email TEXT NOT NULL,
//!     claimed_at      TIMESTAMPTZ,
//!     created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     updated_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     completed_at    TIMESTAMPTZ
//! );
//!
//! CREATE TABLE render_job_events (
//!     id         BIGSERIAL PRIMARY KEY,
//!     job_id     UUID NOT NULL REFERENCES render_jobs (id),
//!     event_type TEXT NOT NULL,
//!     event_data JSONB NOT NULL DEFAULT '{}',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! Mutual exclusion rests entirely on status-guarded conditional updates
//! checked through `rows_affected` — no advisory locks, no second writer.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use scall_models::{Job, JobStatus};

use crate::error::{StoreError, StoreResult};

const JOB_COLUMNS: &str = "id, status, retry_count, recording_key, video_url, notified_at, \
     error_message, child_name, recipient_email, claimed_at, created_at, updated_at, completed_at";

/// Configuration for the job store connection pool.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Pool size; the worker runs one job at a time so this stays small
    pub max_connections: u32,
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| StoreError::config_error("DATABASE_URL not set"))?,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        })
    }
}

/// Postgres-backed access to render jobs and their audit log.
#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
}

impl JobStore {
    /// Connect a pool with the given configuration.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        info!("Connected to job store");
        Ok(Self { pool })
    }

    /// Connect from environment variables.
    pub async fn from_env() -> StoreResult<Self> {
        Self::connect(&StoreConfig::from_env()?).await
    }

    /// Wrap an existing pool (tests, shared pools).
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a job by id.
    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM render_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| job_from_row(&r)).transpose()
    }

    /// Claim the oldest eligible job, if any.
    ///
    /// Two-step claim: select the oldest candidate, then transition it to
    /// `processing` only if the row still carries the status and claim
    /// timestamp we observed. A zero affected-row count means another
    /// worker (or loop iteration) won the race; that is benign and
    /// reported as `Ok(None)`.
    ///
    /// With `lease_secs > 0`, `processing` rows whose claim is older than
    /// the lease are also eligible, so jobs orphaned by a crashed worker
    /// become reclaimable. The `claimed_at` guard is what keeps a reclaim
    /// exclusive: two workers can observe the same expired row, but only
    /// the first update still matches it. `retry_count` is untouched by a
    /// reclaim.
    pub async fn claim_next_job(&self, lease_secs: u64) -> StoreResult<Option<Job>> {
        let candidate = if lease_secs > 0 {
            sqlx::query(
                "SELECT id, status, claimed_at FROM render_jobs \
                 WHERE (status = 'pending' \
                        OR (status = 'processing' \
                            AND claimed_at < now() - make_interval(secs => $1))) \
                   AND recording_key <> '' \
                 ORDER BY created_at ASC \
                 LIMIT 1",
            )
            .bind(lease_secs as f64)
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, status, claimed_at FROM render_jobs \
                 WHERE status = 'pending' AND recording_key <> '' \
                 ORDER BY created_at ASC \
                 LIMIT 1",
            )
            .fetch_optional(&self.pool)
            .await?
        };

        let Some(row) = candidate else {
            return Ok(None);
        };

        let id: Uuid = row.try_get("id")?;
        let observed_status: String = row.try_get("status")?;
        let observed_claimed_at: Option<DateTime<Utc>> = row.try_get("claimed_at")?;

        let updated = sqlx::query(
            "UPDATE render_jobs \
             SET status = 'processing', claimed_at = now(), updated_at = now() \
             WHERE id = $1 AND status = $2 AND claimed_at IS NOT DISTINCT FROM $3",
        )
        .bind(id)
        .bind(&observed_status)
        .bind(observed_claimed_at)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            debug!(job_id = %id, "Lost claim race, job taken by another worker");
            return Ok(None);
        }

        self.get(id).await?.ok_or(StoreError::NotFound(id)).map(Some)
    }

    /// Mark a job as processing. No-op overwrite for an already-claimed job.
    pub async fn mark_processing(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE render_jobs SET status = 'processing', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a successful render: completed status, public video URL,
    /// completion timestamp. Overwrites any previous attempt's outcome.
    pub async fn mark_completed(&self, id: Uuid, video_url: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE render_jobs \
             SET status = 'completed', video_url = $2, error_message = NULL, \
                 completed_at = now(), updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(video_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Return a failed job to the pending pool with its bumped retry count.
    pub async fn schedule_retry(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE render_jobs \
             SET status = 'pending', retry_count = $2, error_message = $3, \
                 claimed_at = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Permanently fail a job that exhausted its retries.
    pub async fn mark_failed_permanently(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE render_jobs \
             SET status = 'failed', retry_count = $2, error_message = $3, \
                 claimed_at = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomically take the right to send the completion email.
    ///
    /// Returns `true` for exactly one caller per job: the NULL guard makes
    /// the check-and-set a single conditional update, so a retried job that
    /// completes twice still notifies at most once.
    pub async fn try_mark_notified(&self, id: Uuid) -> StoreResult<bool> {
        let updated = sqlx::query(
            "UPDATE render_jobs \
             SET notified_at = now(), updated_at = now() \
             WHERE id = $1 AND notified_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() == 1)
    }

    /// Append an audit event. The log is insert-only.
    pub async fn insert_event(
        &self,
        job_id: Uuid,
        event_type: &str,
        event_data: serde_json::Value,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO render_job_events (job_id, event_type, event_data) VALUES ($1, $2, $3)",
        )
        .bind(job_id)
        .bind(event_type)
        .bind(event_data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Map a `render_jobs` row into the shared model.
fn job_from_row(row: &PgRow) -> StoreResult<Job> {
    let status_text: String = row.try_get("status")?;
    let status: JobStatus = status_text
        .parse()
        .map_err(|e| StoreError::invalid_row(format!("{}", e)))?;

    Ok(Job {
        id: row.try_get("id")?,
        status,
        retry_count: row.try_get("retry_count")?,
        recording_key: row.try_get("recording_key")?,
        video_url: row.try_get::<Option<String>, _>("video_url")?,
        notified_at: row.try_get::<Option<DateTime<Utc>>, _>("notified_at")?,
        error_message: row.try_get::<Option<String>, _>("error_message")?,
        child_name: row.try_get("child_name")?,
        recipient_email: row.try_get("recipient_email")?,
        claimed_at: row.try_get::<Option<DateTime<Utc>>, _>("claimed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig {
            database_url: "postgres://localhost/santacall".to_string(),
            max_connections: 5,
        };
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_job_columns_cover_model() {
        // The SELECT list must name every field job_from_row reads.
        for col in [
            "id",
            "status",
            "retry_count",
            "recording_key",
            "video_url",
            "notified_at",
            "error_message",
            "child_name",
            "recipient_email",
            "claimed_at",
            "created_at",
            "updated_at",
            "completed_at",
        ] {
            assert!(JOB_COLUMNS.contains(col), "missing column {col}");
        }
    }
}
