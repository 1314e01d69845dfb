use clipstream_core::models::{JobStats, Priority, TranscodeJob};
use clipstream_core::AppError;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

pub(crate) const JOB_COLUMNS: &str = r#"
    id, asset_id, storage_key, storage_bucket, status, priority, attempts,
    max_attempts, last_error, created_at, started_at, completed_at, updated_at
"#;

/// Repository for the transcode job queue
#[derive(Clone)]
pub struct TranscodeJobRepository {
    pool: PgPool,
}

impl TranscodeJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a transcode job for an asset.
    ///
    /// Idempotent: if a non-terminal job already exists for the asset it is
    /// returned unchanged, so a retried `complete` call cannot double-queue.
    /// The partial unique index on active jobs backstops the check under
    /// concurrent enqueues.
    #[tracing::instrument(skip(self))]
    pub async fn enqueue(
        &self,
        asset_id: Uuid,
        storage_key: &str,
        storage_bucket: &str,
        priority: Priority,
        max_attempts: i32,
    ) -> Result<TranscodeJob, AppError> {
        if let Some(existing) = self.get_active_job(asset_id).await? {
            tracing::info!(
                asset_id = %asset_id,
                job_id = %existing.id,
                status = %existing.status,
                "Asset already queued, returning existing job"
            );
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<Postgres, TranscodeJob>(&format!(
            r#"
            INSERT INTO transcode_jobs (
                asset_id, storage_key, storage_bucket, status, priority,
                attempts, max_attempts
            )
            VALUES ($1, $2, $3, 'PENDING', $4, 0, $5)
            ON CONFLICT (asset_id) WHERE status IN ('PENDING', 'PROCESSING')
            DO NOTHING
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(asset_id)
        .bind(storage_key)
        .bind(storage_bucket)
        .bind(priority.as_i32())
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(job) => {
                tracing::info!(
                    asset_id = %asset_id,
                    job_id = %job.id,
                    priority = %priority,
                    "Transcode job enqueued"
                );
                Ok(job)
            }
            None => {
                // Lost a concurrent-enqueue race; the winner's job is the one.
                self.get_active_job(asset_id).await?.ok_or_else(|| {
                    AppError::Internal(format!(
                        "Transcode job for asset {} vanished during enqueue",
                        asset_id
                    ))
                })
            }
        }
    }

    /// Claim the next eligible job: PENDING, attempts remaining, highest
    /// priority first, oldest first within a band.
    ///
    /// Selection and transition are one statement so two schedulers can never
    /// claim the same job; SKIP LOCKED makes concurrent claimants pick
    /// different rows instead of blocking. The claim itself increments
    /// `attempts` and stamps `started_at`.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next(&self) -> Result<Option<TranscodeJob>, AppError> {
        let job = sqlx::query_as::<Postgres, TranscodeJob>(&format!(
            r#"
            UPDATE transcode_jobs
            SET status = 'PROCESSING',
                started_at = NOW(),
                attempts = attempts + 1,
                updated_at = NOW()
            WHERE id = (
                SELECT id FROM transcode_jobs
                WHERE status = 'PENDING' AND attempts < max_attempts
                ORDER BY priority DESC, created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref job) = job {
            tracing::info!(
                job_id = %job.id,
                asset_id = %job.asset_id,
                priority = job.priority,
                attempt = job.attempts,
                "Transcode job claimed"
            );
        }

        Ok(job)
    }

    /// Mark a job COMPLETED. Called only after the asset has been updated
    /// with playback metadata.
    #[tracing::instrument(skip(self))]
    pub async fn mark_completed(&self, job_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE transcode_jobs
            SET status = 'COMPLETED', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Return a failed-but-retryable job to PENDING for a future claim.
    #[tracing::instrument(skip(self))]
    pub async fn release_for_retry(&self, job_id: Uuid, last_error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE transcode_jobs
            SET status = 'PENDING', last_error = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(job_id)
        .bind(last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a job FAILED after its final attempt. Terminal.
    #[tracing::instrument(skip(self))]
    pub async fn mark_failed(&self, job_id: Uuid, last_error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE transcode_jobs
            SET status = 'FAILED', last_error = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(job_id)
        .bind(last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Manual re-enqueue of the most recent FAILED job for an asset.
    /// Resets the attempt counter so the job gets a fresh retry budget.
    #[tracing::instrument(skip(self))]
    pub async fn requeue_failed(&self, asset_id: Uuid) -> Result<Option<TranscodeJob>, AppError> {
        let job = sqlx::query_as::<Postgres, TranscodeJob>(&format!(
            r#"
            UPDATE transcode_jobs
            SET status = 'PENDING',
                attempts = 0,
                last_error = NULL,
                started_at = NULL,
                updated_at = NOW()
            WHERE id = (
                SELECT id FROM transcode_jobs
                WHERE asset_id = $1 AND status = 'FAILED'
                ORDER BY created_at DESC
                LIMIT 1
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref job) = job {
            tracing::info!(job_id = %job.id, asset_id = %asset_id, "Failed job requeued");
        }

        Ok(job)
    }

    /// Per-status queue counts.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<JobStats, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE status = 'PROCESSING') AS processing,
                COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed,
                COUNT(*) FILTER (WHERE status = 'FAILED') AS failed
            FROM transcode_jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(JobStats {
            total: row.get("total"),
            pending: row.get("pending"),
            processing: row.get("processing"),
            completed: row.get("completed"),
            failed: row.get("failed"),
        })
    }

    async fn get_active_job(&self, asset_id: Uuid) -> Result<Option<TranscodeJob>, AppError> {
        let job = sqlx::query_as::<Postgres, TranscodeJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM transcode_jobs
            WHERE asset_id = $1 AND status IN ('PENDING', 'PROCESSING')
            "#
        ))
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }
}
