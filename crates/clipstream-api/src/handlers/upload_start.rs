use crate::auth::OwnerId;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{Duration as ChronoDuration, Utc};
use clipstream_core::constants::{PART_SIZE_BYTES, PART_URL_TTL_SECS, SESSION_TTL_HOURS};
use clipstream_core::models::{
    total_parts, PresignedPart, StartUploadRequest, StartUploadResponse,
};
use clipstream_core::AppError;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Negotiate a multipart upload: create it on the storage backend, presign
/// one PUT URL per part, and persist the session.
#[utoipa::path(
    post,
    path = "/api/v0/upload/start",
    tag = "upload",
    request_body = StartUploadRequest,
    responses(
        (status = 200, description = "Upload session created", body = StartUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse),
        (status = 503, description = "Storage backend unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        owner_id = %owner.0,
        file_name = %request.file_name,
        file_size_bytes = request.file_size_bytes,
        asset_type = %request.asset_type,
        operation = "upload_start"
    )
)]
pub async fn start_upload(
    owner: OwnerId,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<StartUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let part_count = total_parts(request.file_size_bytes, PART_SIZE_BYTES);
    let object_key = clipstream_storage::object_key(
        request.campaign_id.as_deref(),
        &request.file_name,
        Utc::now().timestamp_millis(),
    );

    tracing::info!(
        object_key = %object_key,
        total_parts = part_count,
        "Starting multipart upload"
    );

    let external_upload_id = state
        .storage
        .create_multipart_upload(&object_key, &request.mime_type)
        .await?;

    let part_url_ttl = Duration::from_secs(PART_URL_TTL_SECS);
    let mut parts = Vec::with_capacity(part_count as usize);
    for part_number in 1..=part_count {
        let url = state
            .storage
            .presign_part_upload(
                &object_key,
                &external_upload_id,
                part_number as i32,
                part_url_ttl,
            )
            .await?;
        parts.push(PresignedPart { part_number, url });
    }

    let metadata = request
        .metadata
        .as_ref()
        .map(|m| m.sanitized())
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()));

    let session = state
        .sessions
        .create_session(
            external_upload_id.clone(),
            object_key.clone(),
            request.file_name.clone(),
            request.file_size_bytes as i64,
            request.mime_type.clone(),
            part_count as i32,
            owner.0,
            request.campaign_id.clone(),
            metadata,
            Utc::now() + ChronoDuration::hours(SESSION_TTL_HOURS),
        )
        .await?;

    tracing::info!(
        session_id = %session.id,
        presigned_parts = parts.len(),
        "Upload session ready"
    );

    Ok(Json(StartUploadResponse {
        session_id: session.id,
        external_upload_id,
        object_key,
        part_size_bytes: PART_SIZE_BYTES,
        total_parts: part_count,
        parts,
    }))
}
