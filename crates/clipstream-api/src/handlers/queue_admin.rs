//! Operator endpoints for the transcode queue: stats, batch sweep, and
//! manual re-enqueue of terminally failed jobs.

use crate::auth::OwnerId;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use clipstream_core::models::{JobStats, Priority};
use clipstream_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessQueueRequest {
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessQueueResponse {
    pub processed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequeueResponse {
    pub job_id: Uuid,
    pub asset_id: Uuid,
}

/// Per-status job counts.
#[utoipa::path(
    get,
    path = "/api/v0/queue/stats",
    tag = "queue",
    responses(
        (status = 200, description = "Queue statistics", body = JobStats),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.0))]
pub async fn queue_stats(
    owner: OwnerId,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let stats: JobStats = state.jobs.stats().await?;
    Ok(Json(stats))
}

/// Drain up to `batchSize` pending jobs now, in priority order. The
/// background scheduler keeps running either way; this is the cron-style
/// sweep for deployments without one.
#[utoipa::path(
    post,
    path = "/api/v0/queue/process",
    tag = "queue",
    request_body = ProcessQueueRequest,
    responses(
        (status = 200, description = "Jobs processed", body = ProcessQueueResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(owner_id = %owner.0))]
pub async fn process_queue(
    owner: OwnerId,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ProcessQueueRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let batch_size = request.batch_size.unwrap_or(state.queue.batch_size());
    let processed = state.queue.process_batch(batch_size).await?;
    Ok(Json(ProcessQueueResponse { processed }))
}

/// Manually re-enqueue transcoding for an asset: reset its most recent
/// FAILED job with a fresh retry budget, or — for a video asset orphaned
/// without any job — enqueue a new one. Returns the asset to PROCESSING.
#[utoipa::path(
    post,
    path = "/api/v0/queue/requeue/{asset_id}",
    tag = "queue",
    params(("asset_id" = Uuid, Path, description = "Asset to requeue for transcoding")),
    responses(
        (status = 200, description = "Job requeued", body = RequeueResponse),
        (status = 400, description = "Asset does not need transcoding", body = ErrorResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse),
        (status = 404, description = "Unknown asset", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.0))]
pub async fn requeue_failed(
    owner: OwnerId,
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = match state.jobs.requeue_failed(asset_id).await? {
        Some(job) => {
            state.queue.kick();
            job
        }
        None => {
            // No failed job to reset. Recover an orphaned video asset (e.g.
            // a crash between asset creation and enqueue) with a fresh job.
            let asset = state.assets.get_asset(asset_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Asset not found: {}", asset_id))
            })?;
            if !asset.asset_type.requires_transcode() {
                return Err(HttpAppError(AppError::InvalidInput(format!(
                    "Asset {} is {} and does not need transcoding",
                    asset_id, asset.asset_type
                ))));
            }
            state
                .queue
                .submit(
                    asset.id,
                    &asset.storage_key,
                    &asset.storage_bucket,
                    Priority::Normal,
                )
                .await?
        }
    };

    state.assets.mark_processing(asset_id).await?;

    tracing::info!(asset_id = %asset_id, job_id = %job.id, "Transcode manually requeued");

    Ok(Json(RequeueResponse {
        job_id: job.id,
        asset_id,
    }))
}
