//! Fixed parameters of the upload protocol.

/// Size of one multipart upload part. Clients slice the file into parts of
/// exactly this size; only the final part may be shorter.
pub const PART_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Lifetime of a presigned part-upload URL.
pub const PART_URL_TTL_SECS: u64 = 3600;

/// Lifetime of an upload session. Completion attempts after this window mark
/// the session EXPIRED.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Lifetime of the signed download URL handed to the streaming provider.
pub const DOWNLOAD_URL_TTL_SECS: u64 = 3600;

/// Object key prefix for files that were uploaded without a campaign.
pub const UNCATEGORIZED_PREFIX: &str = "uncategorized";

/// Maximum length of a sanitized metadata value.
pub const METADATA_VALUE_MAX_LEN: usize = 500;
