pub mod asset;
pub mod transcode_job;
pub mod upload_session;

pub use asset::{Asset, AssetStatus, AssetType, NewAsset, PlaybackMetadata};
pub use transcode_job::{JobStats, JobStatus, Priority, TranscodeJob};
pub use upload_session::{
    total_parts, CompleteUploadRequest, CompleteUploadResponse, CompletedPartInput, PresignedPart,
    StartUploadRequest, StartUploadResponse, UploadMetadata, UploadSession, UploadSessionStatus,
};
