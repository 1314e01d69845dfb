//! Clipstream database layer
//!
//! Repositories over Postgres for the three durable records of the pipeline:
//! upload sessions, assets, and transcode jobs. Queries are built with runtime
//! binding (no compile-time DATABASE_URL requirement).

pub mod asset;
pub mod ingest;
pub mod transcode_job;
pub mod upload_session;

pub use asset::AssetRepository;
pub use ingest::IngestRepository;
pub use transcode_job::TranscodeJobRepository;
pub use upload_session::UploadSessionRepository;
