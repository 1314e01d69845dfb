use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Video,
    Image,
    Document,
}

impl AssetType {
    /// Only video goes through the external transcode pipeline; other kinds
    /// are ready as soon as the upload is finalized.
    pub fn requires_transcode(&self) -> bool {
        matches!(self, AssetType::Video)
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetType::Video => write!(f, "VIDEO"),
            AssetType::Image => write!(f, "IMAGE"),
            AssetType::Document => write!(f, "DOCUMENT"),
        }
    }
}

impl FromStr for AssetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VIDEO" => Ok(AssetType::Video),
            "IMAGE" => Ok(AssetType::Image),
            "DOCUMENT" => Ok(AssetType::Document),
            _ => Err(anyhow::anyhow!("Invalid asset type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetStatus {
    Processing,
    Ready,
    Error,
}

impl Display for AssetStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetStatus::Processing => write!(f, "PROCESSING"),
            AssetStatus::Ready => write!(f, "READY"),
            AssetStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for AssetStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(AssetStatus::Processing),
            "READY" => Ok(AssetStatus::Ready),
            "ERROR" => Ok(AssetStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid asset status: {}", s)),
        }
    }
}

/// A finalized ingested object.
///
/// Created by the upload coordinator at completion time. For video assets the
/// transcode worker owns all further mutation; non-video assets are immutable
/// once READY.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub asset_type: AssetType,
    pub title: String,
    pub filename: String,
    pub original_size_bytes: i64,
    pub status: AssetStatus,
    pub storage_key: String,
    pub storage_bucket: String,
    pub mime_type: String,
    pub owner_id: Uuid,
    pub stream_id: Option<String>,
    pub playback_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub resolution: Option<String>,
    pub error_metadata: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Asset {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Asset {
            id: row.get("id"),
            asset_type: row.get::<String, _>("asset_type").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse asset_type: {}", e).into())
            })?,
            title: row.get("title"),
            filename: row.get("filename"),
            original_size_bytes: row.get("original_size_bytes"),
            status: row.get::<String, _>("status").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse asset status: {}", e).into())
            })?,
            storage_key: row.get("storage_key"),
            storage_bucket: row.get("storage_bucket"),
            mime_type: row.get("mime_type"),
            owner_id: row.get("owner_id"),
            stream_id: row.get("stream_id"),
            playback_url: row.get("playback_url"),
            thumbnail_url: row.get("thumbnail_url"),
            duration_seconds: row.get("duration_seconds"),
            resolution: row.get("resolution"),
            error_metadata: row.get("error_metadata"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

/// Parameters for creating an asset at upload-completion time.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub asset_type: AssetType,
    pub title: String,
    pub filename: String,
    pub original_size_bytes: i64,
    pub storage_key: String,
    pub storage_bucket: String,
    pub mime_type: String,
    pub owner_id: Uuid,
    pub metadata: Option<serde_json::Value>,
}

impl NewAsset {
    /// Initial status: video waits for the transcode pipeline, everything
    /// else is immediately ready.
    pub fn initial_status(&self) -> AssetStatus {
        if self.asset_type.requires_transcode() {
            AssetStatus::Processing
        } else {
            AssetStatus::Ready
        }
    }
}

/// Finalized playback metadata fetched from the streaming provider.
///
/// Written to the asset in a single statement together with the READY flip so
/// an asset is never observable with partial playback fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    pub stream_id: String,
    pub playback_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: Option<f64>,
    pub resolution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_video_requires_transcode() {
        assert!(AssetType::Video.requires_transcode());
        assert!(!AssetType::Image.requires_transcode());
        assert!(!AssetType::Document.requires_transcode());
    }

    #[test]
    fn asset_type_round_trips() {
        for kind in [AssetType::Video, AssetType::Image, AssetType::Document] {
            assert_eq!(kind.to_string().parse::<AssetType>().unwrap(), kind);
        }
        assert!("AUDIO".parse::<AssetType>().is_err());
    }

    #[test]
    fn asset_status_round_trips() {
        for status in [AssetStatus::Processing, AssetStatus::Ready, AssetStatus::Error] {
            assert_eq!(status.to_string().parse::<AssetStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<AssetStatus>().is_err());
    }

    #[test]
    fn initial_status_branches_on_type() {
        let mut asset = new_asset_fixture(AssetType::Video);
        assert_eq!(asset.initial_status(), AssetStatus::Processing);
        asset.asset_type = AssetType::Image;
        assert_eq!(asset.initial_status(), AssetStatus::Ready);
        asset.asset_type = AssetType::Document;
        assert_eq!(asset.initial_status(), AssetStatus::Ready);
    }

    #[test]
    fn asset_type_wire_format_is_uppercase() {
        assert_eq!(
            serde_json::to_value(AssetType::Video).unwrap(),
            serde_json::json!("VIDEO")
        );
        let parsed: AssetType = serde_json::from_value(serde_json::json!("DOCUMENT")).unwrap();
        assert_eq!(parsed, AssetType::Document);
    }

    fn new_asset_fixture(asset_type: AssetType) -> NewAsset {
        NewAsset {
            asset_type,
            title: "keynote".to_string(),
            filename: "keynote.mp4".to_string(),
            original_size_bytes: 1024,
            storage_key: "uploads/uncategorized/1-keynote.mp4".to_string(),
            storage_bucket: "media".to_string(),
            mime_type: "video/mp4".to_string(),
            owner_id: Uuid::new_v4(),
            metadata: None,
        }
    }
}
