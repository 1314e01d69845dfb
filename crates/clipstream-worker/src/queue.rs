//! Transcode queue: worker pool, polling scheduler, bounded retry.
//!
//! Shutdown: [`TranscodeQueue::shutdown`] signals the pool to stop; it does
//! not wait for in-flight jobs. A job interrupted mid-flight stays PROCESSING
//! until an operator intervenes; its attempt is already spent.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use uuid::Uuid;

use clipstream_core::models::{Priority, TranscodeJob};
use clipstream_core::{AppError, TranscodeError};
use clipstream_db::{AssetRepository, TranscodeJobRepository};

use crate::transcode::TranscodeWorker;

#[derive(Clone)]
pub struct TranscodeQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    /// Jobs drained per batch sweep.
    pub batch_size: usize,
    pub max_attempts: i32,
}

impl Default for TranscodeQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1000,
            batch_size: 5,
            max_attempts: 3,
        }
    }
}

/// What to do with a job whose run failed. `attempts` was already incremented
/// at claim time, so "can retry" means attempts remain after this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureDisposition {
    /// Return to PENDING for a future claim.
    Retry,
    /// FAILED, and the asset goes to ERROR.
    Terminal,
}

fn disposition_for(error_retryable: bool, attempts_remain: bool) -> FailureDisposition {
    if error_retryable && attempts_remain {
        FailureDisposition::Retry
    } else {
        FailureDisposition::Terminal
    }
}

pub struct TranscodeQueue {
    jobs: TranscodeJobRepository,
    assets: AssetRepository,
    worker: Arc<TranscodeWorker>,
    config: TranscodeQueueConfig,
    shutdown_tx: mpsc::Sender<()>,
    kick_tx: mpsc::Sender<()>,
}

impl TranscodeQueue {
    /// Create the queue and start its scheduler loop.
    ///
    /// The scheduler claims at most one job per wake-up (poll tick or kick)
    /// and dispatches it onto the pool; the semaphore bounds concurrent
    /// provider work at `max_workers`.
    pub fn new(
        jobs: TranscodeJobRepository,
        assets: AssetRepository,
        worker: Arc<TranscodeWorker>,
        config: TranscodeQueueConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (kick_tx, kick_rx) = mpsc::channel(16);

        let jobs_clone = jobs.clone();
        let assets_clone = assets.clone();
        let worker_clone = worker.clone();
        let config_clone = config.clone();

        tokio::spawn(async move {
            Self::scheduler_loop(
                jobs_clone,
                assets_clone,
                worker_clone,
                config_clone,
                shutdown_rx,
                kick_rx,
            )
            .await;
        });

        Self {
            jobs,
            assets,
            worker,
            config,
            shutdown_tx,
            kick_tx,
        }
    }

    /// Enqueue a transcode job for an asset.
    ///
    /// Returns the existing job unchanged if the asset is already queued.
    /// HIGH-priority jobs additionally get an immediate out-of-band claim
    /// cycle instead of waiting for the next poll tick; ordering is
    /// unaffected, the job just gets an earlier chance.
    #[tracing::instrument(skip(self))]
    pub async fn submit(
        &self,
        asset_id: Uuid,
        storage_key: &str,
        storage_bucket: &str,
        priority: Priority,
    ) -> Result<TranscodeJob, AppError> {
        let job = self
            .jobs
            .enqueue(
                asset_id,
                storage_key,
                storage_bucket,
                priority,
                self.config.max_attempts,
            )
            .await?;

        if priority == Priority::High {
            self.kick();
        }

        Ok(job)
    }

    /// Wake the scheduler for an immediate claim cycle.
    pub fn kick(&self) {
        // A full channel already has wake-ups queued; dropping this one is fine.
        let _ = self.kick_tx.try_send(());
    }

    /// Drain up to `batch_size` jobs, processing each to completion before
    /// claiming the next. Returns the number of jobs processed. Used by the
    /// operator sweep endpoint; the background scheduler runs independently.
    #[tracing::instrument(skip(self))]
    pub async fn process_batch(&self, batch_size: usize) -> Result<usize, AppError> {
        let mut processed = 0;
        for _ in 0..batch_size {
            match self.jobs.claim_next().await? {
                Some(job) => {
                    Self::process_claimed(&self.jobs, &self.assets, &self.worker, job).await;
                    processed += 1;
                }
                None => break,
            }
        }

        tracing::info!(processed = processed, "Batch sweep finished");

        Ok(processed)
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    async fn scheduler_loop(
        jobs: TranscodeJobRepository,
        assets: AssetRepository,
        worker: Arc<TranscodeWorker>,
        config: TranscodeQueueConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
        mut kick_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            "Transcode queue scheduler started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Transcode queue scheduler shutting down");
                    break;
                }
                _ = kick_rx.recv() => {
                    Self::claim_and_dispatch_one(&jobs, &assets, &worker, &semaphore).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&jobs, &assets, &worker, &semaphore).await;
                }
            }
        }

        tracing::info!("Transcode queue scheduler stopped");
    }

    async fn claim_and_dispatch_one(
        jobs: &TranscodeJobRepository,
        assets: &AssetRepository,
        worker: &Arc<TranscodeWorker>,
        semaphore: &Arc<Semaphore>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match jobs.claim_next().await {
            Ok(Some(job)) => {
                let jobs = jobs.clone();
                let assets = assets.clone();
                let worker = worker.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::process_claimed(&jobs, &assets, &worker, job).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No pending transcode jobs");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim transcode job");
            }
        }
    }

    /// Run one claimed job and absorb the outcome into job/asset state.
    /// Errors never propagate past this point; the scheduler moves on to the
    /// next job regardless.
    #[tracing::instrument(skip(jobs, assets, worker, job), fields(job_id = %job.id, asset_id = %job.asset_id, attempt = job.attempts))]
    async fn process_claimed(
        jobs: &TranscodeJobRepository,
        assets: &AssetRepository,
        worker: &TranscodeWorker,
        job: TranscodeJob,
    ) {
        let outcome = match worker.run(&job).await {
            Ok(playback) => {
                // Asset first, then job: COMPLETED requires the playback
                // metadata to already be visible.
                match assets.update_playback_ready(job.asset_id, &playback).await {
                    Ok(()) => jobs.mark_completed(job.id).await.map(|_| true),
                    Err(e) => {
                        Self::handle_failure(
                            jobs,
                            assets,
                            &job,
                            &TranscodeError::retryable(anyhow::anyhow!(
                                "Failed to write playback metadata: {}",
                                e
                            )),
                        )
                        .await;
                        Ok(false)
                    }
                }
            }
            Err(e) => {
                Self::handle_failure(jobs, assets, &job, &e).await;
                Ok(false)
            }
        };

        match outcome {
            Ok(true) => {
                tracing::info!("Transcode job completed");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to record job completion");
            }
        }
    }

    async fn handle_failure(
        jobs: &TranscodeJobRepository,
        assets: &AssetRepository,
        job: &TranscodeJob,
        error: &TranscodeError,
    ) {
        match disposition_for(error.is_retryable(), job.can_retry()) {
            FailureDisposition::Retry => {
                tracing::warn!(
                    error = %error,
                    attempt = job.attempts,
                    max_attempts = job.max_attempts,
                    "Transcode attempt failed, job returns to queue"
                );
                if let Err(e) = jobs.release_for_retry(job.id, &error.to_string()).await {
                    tracing::error!(error = %e, "Failed to release job for retry");
                }
            }
            FailureDisposition::Terminal => {
                tracing::error!(
                    error = %error,
                    attempts = job.attempts,
                    "Transcode job failed terminally"
                );
                if let Err(e) = jobs.mark_failed(job.id, &error.to_string()).await {
                    tracing::error!(error = %e, "Failed to mark job FAILED");
                }
                let error_metadata = json!({
                    "error": error.to_string(),
                    "failed_at": Utc::now().to_rfc3339(),
                    "attempts": job.attempts,
                });
                if let Err(e) = assets.mark_error(job.asset_id, error_metadata).await {
                    tracing::error!(error = %e, "Failed to mark asset ERROR");
                }
            }
        }
    }

    /// Signal the scheduler to stop claiming jobs. Returns immediately;
    /// in-flight jobs run to completion or failure.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating transcode queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl Clone for TranscodeQueue {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            assets: self.assets.clone(),
            worker: self.worker.clone(),
            config: self.config.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            kick_tx: self.kick_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_error_with_attempts_left_retries() {
        assert_eq!(disposition_for(true, true), FailureDisposition::Retry);
    }

    #[test]
    fn retryable_error_without_attempts_is_terminal() {
        assert_eq!(disposition_for(true, false), FailureDisposition::Terminal);
    }

    #[test]
    fn terminal_error_is_terminal_regardless_of_attempts() {
        assert_eq!(disposition_for(false, true), FailureDisposition::Terminal);
        assert_eq!(disposition_for(false, false), FailureDisposition::Terminal);
    }

    #[test]
    fn default_config_matches_queue_defaults() {
        let config = TranscodeQueueConfig::default();
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_attempts, 3);
    }
}
