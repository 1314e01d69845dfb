//! Application state shared across handlers.

use std::sync::Arc;

use clipstream_db::{
    AssetRepository, IngestRepository, TranscodeJobRepository, UploadSessionRepository,
};
use clipstream_storage::ObjectStorage;
use clipstream_worker::TranscodeQueue;
use sqlx::PgPool;

use crate::notify::PipelineNotifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sessions: UploadSessionRepository,
    pub ingest: IngestRepository,
    pub assets: AssetRepository,
    pub jobs: TranscodeJobRepository,
    pub storage: Arc<dyn ObjectStorage>,
    pub queue: TranscodeQueue,
    pub notifier: PipelineNotifier,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
