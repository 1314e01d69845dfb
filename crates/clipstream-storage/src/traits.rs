//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait the upload coordinator and the
//! transcode worker program against, so tests can substitute an in-memory
//! double for the real S3 backend.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Multipart upload creation failed: {0}")]
    CreateFailed(String),

    #[error("Presigning failed: {0}")]
    PresignFailed(String),

    #[error("Multipart completion failed: {0}")]
    CompleteFailed(String),

    #[error("Multipart abort failed: {0}")]
    AbortFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One finished part, as reported by the client after its direct PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUploadPart {
    pub part_number: i32,
    pub e_tag: String,
}

/// Object storage gateway trait
///
/// Covers exactly the operations the ingestion pipeline needs: multipart
/// negotiation and completion on the upload side, and time-bounded download
/// URLs on the transcode side.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Start a multipart upload for `key` and return the backend's opaque
    /// upload handle.
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Presign a PUT URL for one part of an in-flight multipart upload.
    async fn presign_part_upload(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Finalize a multipart upload from the parts the client uploaded.
    /// `parts` must be sorted by part number.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedUploadPart],
    ) -> StorageResult<()>;

    /// Abandon an in-flight multipart upload and let the backend reclaim the
    /// uploaded parts.
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> StorageResult<()>;

    /// Presign a time-bounded GET URL for `key`.
    async fn presign_download(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Bucket this gateway operates on.
    fn bucket(&self) -> &str;
}
