use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::constants::METADATA_VALUE_MAX_LEN;
use crate::models::asset::AssetType;
use crate::models::transcode_job::Priority;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadSessionStatus {
    InProgress,
    Completed,
    Expired,
}

impl Display for UploadSessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadSessionStatus::InProgress => write!(f, "IN_PROGRESS"),
            UploadSessionStatus::Completed => write!(f, "COMPLETED"),
            UploadSessionStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

impl FromStr for UploadSessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(UploadSessionStatus::InProgress),
            "COMPLETED" => Ok(UploadSessionStatus::Completed),
            "EXPIRED" => Ok(UploadSessionStatus::Expired),
            _ => Err(anyhow::anyhow!("Invalid upload session status: {}", s)),
        }
    }
}

/// One negotiated multipart upload. Created on `start`, mutated once on
/// successful completion, never deleted (retained for audit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: Uuid,
    /// Full multipart upload handle from the storage backend. Stored
    /// verbatim and validated by exact equality on completion.
    pub external_upload_id: String,
    pub object_key: String,
    pub file_name: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub total_parts: i32,
    /// Part numbers the client reported at completion time; empty while the
    /// session is in progress.
    pub uploaded_part_numbers: Vec<i32>,
    pub status: UploadSessionStatus,
    pub owner_id: Uuid,
    pub campaign_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for UploadSession {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(UploadSession {
            id: row.get("id"),
            external_upload_id: row.get("external_upload_id"),
            object_key: row.get("object_key"),
            file_name: row.get("file_name"),
            file_size_bytes: row.get("file_size_bytes"),
            mime_type: row.get("mime_type"),
            total_parts: row.get("total_parts"),
            uploaded_part_numbers: row.get("uploaded_part_numbers"),
            status: row.get::<String, _>("status").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse session status: {}", e).into())
            })?,
            owner_id: row.get("owner_id"),
            campaign_id: row.get("campaign_id"),
            metadata: row.get("metadata"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl UploadSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == UploadSessionStatus::InProgress
    }

    /// Title for the asset created from this session: the `title` metadata
    /// value if present, otherwise the file name without its extension.
    pub fn derived_title(&self) -> String {
        if let Some(title) = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("title"))
            .and_then(|t| t.as_str())
        {
            if !title.is_empty() {
                return title.to_string();
            }
        }
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => self.file_name.clone(),
        }
    }
}

/// Number of parts a file of `file_size_bytes` splits into at `part_size_bytes`.
pub fn total_parts(file_size_bytes: u64, part_size_bytes: u64) -> u32 {
    file_size_bytes.div_ceil(part_size_bytes) as u32
}

/// Clamp a caller-supplied metadata value to printable ASCII and a bounded
/// length. Runs of other characters collapse to a single space.
pub fn sanitize_metadata(value: &str) -> String {
    let trimmed = value.trim();
    let mut out = String::with_capacity(trimmed.len().min(METADATA_VALUE_MAX_LEN));
    let mut in_run = false;
    for c in trimmed.chars() {
        if (' '..='~').contains(&c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push(' ');
            in_run = true;
        }
    }
    out.truncate(METADATA_VALUE_MAX_LEN);
    out
}

/// Caller-supplied descriptive metadata, sanitized before storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl UploadMetadata {
    pub fn sanitized(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if let Some(ref title) = self.title {
            let title = sanitize_metadata(title);
            if !title.is_empty() {
                map.insert("title".to_string(), serde_json::Value::String(title));
            }
        }
        if let Some(ref description) = self.description {
            let description = sanitize_metadata(description);
            if !description.is_empty() {
                map.insert(
                    "description".to_string(),
                    serde_json::Value::String(description),
                );
            }
        }
        serde_json::Value::Object(map)
    }
}

/// Request to negotiate a multipart upload
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartUploadRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub file_size_bytes: u64,
    #[validate(length(
        min = 1,
        max = 200,
        message = "MIME type must be between 1 and 200 characters"
    ))]
    pub mime_type: String,
    pub asset_type: AssetType,
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<UploadMetadata>,
}

/// One presigned part-upload URL
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignedPart {
    pub part_number: u32,
    pub url: String,
}

/// Response containing the negotiated upload session and part URLs
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartUploadResponse {
    pub session_id: Uuid,
    pub external_upload_id: String,
    pub object_key: String,
    pub part_size_bytes: u64,
    pub total_parts: u32,
    pub parts: Vec<PresignedPart>,
}

/// One part the client finished uploading
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPartInput {
    #[validate(range(min = 1, message = "Part numbers start at 1"))]
    pub part_number: i32,
    #[serde(rename = "eTag")]
    #[validate(length(min = 1, message = "ETag must not be empty"))]
    pub e_tag: String,
}

/// Request to finalize a multipart upload
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    pub session_id: Uuid,
    #[validate(length(min = 1, message = "Upload id must not be empty"))]
    pub external_upload_id: String,
    #[validate(length(min = 1, message = "Parts list must not be empty"), nested)]
    pub parts: Vec<CompletedPartInput>,
    pub asset_type: AssetType,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Response after finalizing an upload
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadResponse {
    pub asset_id: Uuid,
    pub queued_for_transcode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PART_SIZE_BYTES;

    #[test]
    fn total_parts_exact_multiple() {
        assert_eq!(total_parts(20 * 1024 * 1024, PART_SIZE_BYTES), 2);
    }

    #[test]
    fn total_parts_rounds_up() {
        assert_eq!(total_parts(25 * 1024 * 1024, PART_SIZE_BYTES), 3);
        assert_eq!(total_parts(1, PART_SIZE_BYTES), 1);
        assert_eq!(total_parts(PART_SIZE_BYTES + 1, PART_SIZE_BYTES), 2);
    }

    #[test]
    fn status_round_trips() {
        for status in [
            UploadSessionStatus::InProgress,
            UploadSessionStatus::Completed,
            UploadSessionStatus::Expired,
        ] {
            assert_eq!(
                status.to_string().parse::<UploadSessionStatus>().unwrap(),
                status
            );
        }
        assert!("DONE".parse::<UploadSessionStatus>().is_err());
    }

    #[test]
    fn sanitize_metadata_strips_non_printable() {
        assert_eq!(sanitize_metadata("  hello\u{7}\u{8}world  "), "hello world");
        assert_eq!(sanitize_metadata("plain title"), "plain title");
    }

    #[test]
    fn sanitize_metadata_truncates() {
        let long = "a".repeat(600);
        assert_eq!(sanitize_metadata(&long).len(), METADATA_VALUE_MAX_LEN);
    }

    #[test]
    fn derived_title_prefers_metadata() {
        let session = session_fixture(Some(serde_json::json!({"title": "Launch keynote"})));
        assert_eq!(session.derived_title(), "Launch keynote");
    }

    #[test]
    fn derived_title_falls_back_to_file_stem() {
        let session = session_fixture(None);
        assert_eq!(session.derived_title(), "keynote-final");
    }

    #[test]
    fn expiry_is_strict() {
        let session = session_fixture(None);
        assert!(!session.is_expired(session.expires_at));
        assert!(session.is_expired(session.expires_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn complete_request_rejects_empty_parts() {
        use validator::Validate;
        let request = CompleteUploadRequest {
            session_id: Uuid::new_v4(),
            external_upload_id: "upload-1".to_string(),
            parts: vec![],
            asset_type: AssetType::Video,
            priority: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn complete_request_rejects_empty_etag() {
        use validator::Validate;
        let request = CompleteUploadRequest {
            session_id: Uuid::new_v4(),
            external_upload_id: "upload-1".to_string(),
            parts: vec![CompletedPartInput {
                part_number: 1,
                e_tag: String::new(),
            }],
            asset_type: AssetType::Video,
            priority: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let body = serde_json::json!({
            "sessionId": Uuid::new_v4(),
            "externalUploadId": "abc",
            "parts": [{"partNumber": 1, "eTag": "\"etag-1\""}],
            "assetType": "VIDEO",
            "priority": "HIGH"
        });
        let request: CompleteUploadRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.parts[0].e_tag, "\"etag-1\"");
        assert_eq!(request.priority, Some(Priority::High));
    }

    fn session_fixture(metadata: Option<serde_json::Value>) -> UploadSession {
        let now = Utc::now();
        UploadSession {
            id: Uuid::new_v4(),
            external_upload_id: "upload-1".to_string(),
            object_key: "uploads/uncategorized/1-keynote-final.mp4".to_string(),
            file_name: "keynote-final.mp4".to_string(),
            file_size_bytes: 25 * 1024 * 1024,
            mime_type: "video/mp4".to_string(),
            total_parts: 3,
            uploaded_part_numbers: vec![],
            status: UploadSessionStatus::InProgress,
            owner_id: Uuid::new_v4(),
            campaign_id: None,
            metadata,
            expires_at: now + chrono::Duration::hours(24),
            created_at: now,
            updated_at: now,
        }
    }
}
