use crate::auth::OwnerId;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use clipstream_core::models::{CompleteUploadRequest, CompleteUploadResponse, NewAsset};
use clipstream_core::AppError;
use clipstream_storage::CompletedUploadPart;
use std::sync::Arc;
use validator::Validate;

/// Finalize a multipart upload: complete it on the storage backend, then
/// atomically mark the session COMPLETED, create the asset, and (for video)
/// enqueue a transcode job.
#[utoipa::path(
    post,
    path = "/api/v0/upload/complete",
    tag = "upload",
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Upload finalized", body = CompleteUploadResponse),
        (status = 400, description = "Invalid input or expired session", body = ErrorResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Session not in progress", body = ErrorResponse),
        (status = 503, description = "Storage finalize failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        owner_id = %owner.0,
        session_id = %request.session_id,
        asset_type = %request.asset_type,
        operation = "upload_complete"
    )
)]
pub async fn complete_upload(
    owner: OwnerId,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CompleteUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let session = state
        .sessions
        .get_session(request.session_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Upload session not found: {}", request.session_id))
        })?;

    if !session.is_in_progress() {
        return Err(HttpAppError(AppError::SessionState(format!(
            "Upload session is not in progress (status: {})",
            session.status
        ))));
    }

    // The full handle is stored; anything but exact equality is a caller bug.
    if request.external_upload_id != session.external_upload_id {
        return Err(HttpAppError(AppError::InvalidInput(
            "Upload id does not match session".to_string(),
        )));
    }

    if session.is_expired(Utc::now()) {
        state.sessions.mark_expired(session.id).await?;
        return Err(HttpAppError(AppError::SessionExpired(format!(
            "Upload session expired at {}",
            session.expires_at
        ))));
    }

    let mut parts: Vec<CompletedUploadPart> = request
        .parts
        .iter()
        .map(|p| CompletedUploadPart {
            part_number: p.part_number,
            e_tag: p.e_tag.clone(),
        })
        .collect();
    parts.sort_by_key(|p| p.part_number);

    state
        .storage
        .complete_multipart_upload(&session.object_key, &session.external_upload_id, &parts)
        .await?;

    // From here on the object exists in storage. A failure in the local
    // transaction leaves an IN_PROGRESS session with a finalized object; log
    // loudly so an operator can repair the record.
    let title = session.derived_title();
    let mut metadata = session
        .metadata
        .clone()
        .and_then(|v| match v {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();
    metadata.insert(
        "upload_session_id".to_string(),
        serde_json::Value::String(session.id.to_string()),
    );

    let new_asset = NewAsset {
        asset_type: request.asset_type,
        title,
        filename: session.file_name.clone(),
        original_size_bytes: session.file_size_bytes,
        storage_key: session.object_key.clone(),
        storage_bucket: state.storage.bucket().to_string(),
        mime_type: session.mime_type.clone(),
        owner_id: owner.0,
        metadata: Some(serde_json::Value::Object(metadata)),
    };

    let priority = request.priority.unwrap_or_default();
    let part_numbers: Vec<i32> = parts.iter().map(|p| p.part_number).collect();

    let asset = state
        .ingest
        .finalize_upload(session.id, &part_numbers, new_asset)
        .await
        .map_err(|e| {
            tracing::error!(
                session_id = %session.id,
                object_key = %session.object_key,
                error = %e,
                "Storage object finalized but local records were not written; operator repair needed"
            );
            e
        })?;

    let queued_for_transcode = asset.asset_type.requires_transcode();
    if queued_for_transcode {
        // The queue is the authoritative retry path; a failed enqueue here
        // leaves a PROCESSING asset without a job, repairable via the
        // requeue endpoint.
        state
            .queue
            .submit(asset.id, &asset.storage_key, &asset.storage_bucket, priority)
            .await
            .map_err(|e| {
                tracing::error!(
                    asset_id = %asset.id,
                    error = %e,
                    "Asset created but transcode enqueue failed; requeue manually"
                );
                e
            })?;

        state.notifier.notify_video_ingested(asset.id);
    }

    tracing::info!(
        session_id = %session.id,
        asset_id = %asset.id,
        queued_for_transcode = queued_for_transcode,
        "Upload completed"
    );

    Ok(Json(CompleteUploadResponse {
        asset_id: asset.id,
        queued_for_transcode,
    }))
}
