//! Application initialization: database, storage, provider, queue, routes.

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;

use clipstream_core::constants::DOWNLOAD_URL_TTL_SECS;
use clipstream_core::Config;
use clipstream_db::{
    AssetRepository, IngestRepository, TranscodeJobRepository, UploadSessionRepository,
};
use clipstream_storage::{ObjectStorage, S3Storage};
use clipstream_worker::{
    HttpStreamProvider, StreamProvider, TranscodeQueue, TranscodeQueueConfig, TranscodeWorker,
};

use crate::notify::PipelineNotifier;
use crate::state::AppState;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    let pool = database::setup_database(&config).await?;

    let storage: Arc<dyn ObjectStorage> = Arc::new(
        S3Storage::new(
            config.storage_bucket.clone(),
            config.storage_region.clone(),
            config.storage_endpoint.clone(),
        )
        .await
        .context("Failed to initialize object storage gateway")?,
    );

    let provider: Arc<dyn StreamProvider> = Arc::new(
        HttpStreamProvider::new(
            config.stream_api_base.clone(),
            config.stream_account_id.clone(),
            config.stream_api_token.clone(),
        )
        .context("Failed to initialize stream provider client")?,
    );

    let sessions = UploadSessionRepository::new(pool.clone());
    let ingest = IngestRepository::new(pool.clone());
    let assets = AssetRepository::new(pool.clone());
    let jobs = TranscodeJobRepository::new(pool.clone());

    let worker = Arc::new(TranscodeWorker::new(
        storage.clone(),
        provider,
        Duration::from_secs(DOWNLOAD_URL_TTL_SECS),
    ));

    let queue = TranscodeQueue::new(
        jobs.clone(),
        assets.clone(),
        worker,
        TranscodeQueueConfig {
            max_workers: config.queue_max_workers,
            poll_interval_ms: config.queue_poll_interval_ms,
            batch_size: config.queue_batch_size,
            max_attempts: config.queue_max_attempts,
        },
    );

    let notifier = PipelineNotifier::new(
        config.pipeline_base_url.clone(),
        config.app_base_url.clone(),
    )?;

    let state = Arc::new(AppState {
        pool,
        sessions,
        ingest,
        assets,
        jobs,
        storage,
        queue,
        notifier,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
