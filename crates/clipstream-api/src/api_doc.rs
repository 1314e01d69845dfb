//! OpenAPI document for the upload and queue endpoints.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clipstream API",
        description = "Media ingestion and transcode pipeline"
    ),
    paths(
        crate::handlers::upload_start::start_upload,
        crate::handlers::upload_complete::complete_upload,
        crate::handlers::queue_admin::queue_stats,
        crate::handlers::queue_admin::process_queue,
        crate::handlers::queue_admin::requeue_failed,
    ),
    components(schemas(
        clipstream_core::models::StartUploadRequest,
        clipstream_core::models::StartUploadResponse,
        clipstream_core::models::PresignedPart,
        clipstream_core::models::UploadMetadata,
        clipstream_core::models::CompleteUploadRequest,
        clipstream_core::models::CompleteUploadResponse,
        clipstream_core::models::CompletedPartInput,
        clipstream_core::models::JobStats,
        clipstream_core::models::Priority,
        clipstream_core::models::AssetType,
        crate::error::ErrorResponse,
        crate::handlers::queue_admin::ProcessQueueRequest,
        crate::handlers::queue_admin::ProcessQueueResponse,
        crate::handlers::queue_admin::RequeueResponse,
    )),
    tags(
        (name = "upload", description = "Multipart upload session lifecycle"),
        (name = "queue", description = "Transcode queue operations")
    )
)]
pub struct ApiDoc;
