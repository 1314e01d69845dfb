//! Transcode worker: drives one claimed job through the external provider.
//!
//! The worker touches only external collaborators (object storage, streaming
//! provider); all database writes for job/asset state stay in the queue layer
//! so a worker failure can never leave half-written playback metadata.

use std::sync::Arc;
use std::time::Duration;

use clipstream_core::models::{PlaybackMetadata, TranscodeJob};
use clipstream_core::TranscodeError;
use clipstream_storage::ObjectStorage;

use crate::provider::{IngestMeta, StreamProvider};

pub struct TranscodeWorker {
    storage: Arc<dyn ObjectStorage>,
    provider: Arc<dyn StreamProvider>,
    download_url_ttl: Duration,
}

impl TranscodeWorker {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        provider: Arc<dyn StreamProvider>,
        download_url_ttl: Duration,
    ) -> Self {
        Self {
            storage,
            provider,
            download_url_ttl,
        }
    }

    /// Run one claimed job: presign the source, hand it to the provider, and
    /// fetch finalized playback metadata.
    ///
    /// Every failure in these steps is retryable by default — including a
    /// details response that is not ready yet; the queue's bounded retry loop
    /// doubles as the poll loop.
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, asset_id = %job.asset_id))]
    pub async fn run(&self, job: &TranscodeJob) -> Result<PlaybackMetadata, TranscodeError> {
        let download_url = self
            .storage
            .presign_download(&job.storage_key, self.download_url_ttl)
            .await
            .map_err(|e| TranscodeError::retryable(anyhow::anyhow!(e)))?;

        let meta = IngestMeta {
            asset_id: job.asset_id,
            name: display_name(&job.storage_key),
        };

        let stream_id = self
            .provider
            .ingest(&download_url, &meta)
            .await
            .map_err(TranscodeError::retryable)?;

        let details = self
            .provider
            .get_details(&stream_id)
            .await
            .map_err(TranscodeError::retryable)?;

        if !details.ready {
            return Err(TranscodeError::retryable(anyhow::anyhow!(
                "Stream {} is not ready yet",
                stream_id
            )));
        }

        let playback_url = details.playback_url.ok_or_else(|| {
            TranscodeError::retryable(anyhow::anyhow!(
                "Stream {} is ready but has no playback URL",
                stream_id
            ))
        })?;
        let thumbnail_url = details.thumbnail_url.ok_or_else(|| {
            TranscodeError::retryable(anyhow::anyhow!(
                "Stream {} is ready but has no thumbnail URL",
                stream_id
            ))
        })?;

        tracing::info!(
            stream_id = %stream_id,
            duration_seconds = ?details.duration_seconds,
            resolution = ?details.resolution,
            "Transcode finished"
        );

        Ok(PlaybackMetadata {
            stream_id,
            playback_url,
            thumbnail_url,
            duration_seconds: details.duration_seconds,
            resolution: details.resolution,
        })
    }
}

/// Human-readable name for provider dashboards: the file portion of the key.
fn display_name(storage_key: &str) -> String {
    storage_key
        .rsplit('/')
        .next()
        .unwrap_or(storage_key)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StreamDetails;
    use async_trait::async_trait;
    use chrono::Utc;
    use clipstream_core::models::{JobStatus, Priority};
    use clipstream_storage::{CompletedUploadPart, StorageError, StorageResult};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeStorage {
        fail_presign: bool,
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn create_multipart_upload(
            &self,
            _key: &str,
            _content_type: &str,
        ) -> StorageResult<String> {
            Ok("upload-1".to_string())
        }

        async fn presign_part_upload(
            &self,
            key: &str,
            _upload_id: &str,
            part_number: i32,
            _expires_in: Duration,
        ) -> StorageResult<String> {
            Ok(format!("https://storage.test/{}?part={}", key, part_number))
        }

        async fn complete_multipart_upload(
            &self,
            _key: &str,
            _upload_id: &str,
            _parts: &[CompletedUploadPart],
        ) -> StorageResult<()> {
            Ok(())
        }

        async fn abort_multipart_upload(&self, _key: &str, _upload_id: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn presign_download(
            &self,
            key: &str,
            _expires_in: Duration,
        ) -> StorageResult<String> {
            if self.fail_presign {
                return Err(StorageError::BackendError("backend down".to_string()));
            }
            Ok(format!("https://storage.test/{}?signed", key))
        }

        fn bucket(&self) -> &str {
            "test-bucket"
        }
    }

    struct FakeProvider {
        details: StreamDetails,
        ingested: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn new(details: StreamDetails) -> Self {
            Self {
                details,
                ingested: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl StreamProvider for FakeProvider {
        async fn ingest(&self, source_url: &str, _meta: &IngestMeta) -> anyhow::Result<String> {
            self.ingested.lock().unwrap().push(source_url.to_string());
            Ok("stream-xyz".to_string())
        }

        async fn get_details(&self, _handle: &str) -> anyhow::Result<StreamDetails> {
            Ok(self.details.clone())
        }
    }

    fn job_fixture() -> TranscodeJob {
        let now = Utc::now();
        TranscodeJob {
            id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
            storage_key: "uploads/uncategorized/1-keynote.mp4".to_string(),
            storage_bucket: "test-bucket".to_string(),
            status: JobStatus::Processing,
            priority: Priority::Normal.as_i32(),
            attempts: 1,
            max_attempts: 3,
            last_error: None,
            created_at: now,
            started_at: Some(now),
            completed_at: None,
            updated_at: now,
        }
    }

    fn ready_details() -> StreamDetails {
        StreamDetails {
            ready: true,
            playback_url: Some("https://cdn.test/xyz/manifest/video.m3u8".to_string()),
            thumbnail_url: Some("https://cdn.test/xyz/thumbnail.jpg".to_string()),
            duration_seconds: Some(93.5),
            resolution: Some("1920x1080".to_string()),
        }
    }

    fn worker(storage: FakeStorage, provider: FakeProvider) -> TranscodeWorker {
        TranscodeWorker::new(
            Arc::new(storage),
            Arc::new(provider),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn successful_run_returns_full_playback_metadata() {
        let worker = worker(
            FakeStorage {
                fail_presign: false,
            },
            FakeProvider::new(ready_details()),
        );

        let playback = worker.run(&job_fixture()).await.unwrap();
        assert_eq!(playback.stream_id, "stream-xyz");
        assert_eq!(playback.playback_url, "https://cdn.test/xyz/manifest/video.m3u8");
        assert_eq!(playback.resolution.as_deref(), Some("1920x1080"));
    }

    #[tokio::test]
    async fn provider_receives_signed_download_url() {
        let provider = FakeProvider::new(ready_details());
        let storage = FakeStorage {
            fail_presign: false,
        };
        let provider = Arc::new(provider);
        let worker = TranscodeWorker::new(
            Arc::new(storage),
            provider.clone(),
            Duration::from_secs(3600),
        );

        worker.run(&job_fixture()).await.unwrap();

        let ingested = provider.ingested.lock().unwrap();
        assert_eq!(ingested.len(), 1);
        assert!(ingested[0].contains("uploads/uncategorized/1-keynote.mp4"));
        assert!(ingested[0].contains("signed"));
    }

    #[tokio::test]
    async fn not_ready_is_retryable() {
        let worker = worker(
            FakeStorage {
                fail_presign: false,
            },
            FakeProvider::new(StreamDetails {
                ready: false,
                playback_url: None,
                thumbnail_url: None,
                duration_seconds: None,
                resolution: None,
            }),
        );

        let err = worker.run(&job_fixture()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("not ready"));
    }

    #[tokio::test]
    async fn ready_without_playback_url_is_retryable() {
        let mut details = ready_details();
        details.playback_url = None;
        let worker = worker(
            FakeStorage {
                fail_presign: false,
            },
            FakeProvider::new(details),
        );

        let err = worker.run(&job_fixture()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn presign_failure_is_retryable() {
        let worker = worker(
            FakeStorage { fail_presign: true },
            FakeProvider::new(ready_details()),
        );

        let err = worker.run(&job_fixture()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("backend down"));
    }

    #[test]
    fn display_name_takes_file_portion() {
        assert_eq!(
            display_name("uploads/spring/1700-promo.mp4"),
            "1700-promo.mp4"
        );
        assert_eq!(display_name("bare-key.mp4"), "bare-key.mp4");
    }
}
