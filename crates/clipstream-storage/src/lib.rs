//! Object storage gateway
//!
//! Thin, stateless wrapper over the storage backend's multipart-upload and
//! presigning operations. The server is never on the data path for part
//! bytes: clients PUT part payloads directly against presigned URLs, and the
//! transcode worker hands the provider a presigned download URL.

pub mod keys;
pub mod s3;
pub mod traits;

pub use keys::{object_key, sanitize_file_name};
pub use s3::S3Storage;
pub use traits::{CompletedUploadPart, ObjectStorage, StorageError, StorageResult};
