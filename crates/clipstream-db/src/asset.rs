use clipstream_core::models::{Asset, PlaybackMetadata};
use clipstream_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

pub(crate) const ASSET_COLUMNS: &str = r#"
    id, asset_type, title, filename, original_size_bytes, status, storage_key,
    storage_bucket, mime_type, owner_id, stream_id, playback_url,
    thumbnail_url, duration_seconds, resolution, error_metadata, metadata,
    created_at, updated_at
"#;

/// Repository for ingested assets
#[derive(Clone)]
pub struct AssetRepository {
    pool: PgPool,
}

impl AssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_asset(&self, asset_id: Uuid) -> Result<Option<Asset>, AppError> {
        let asset = sqlx::query_as::<Postgres, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1"
        ))
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(asset)
    }

    /// Write finalized playback metadata and flip the asset to READY in one
    /// statement. An asset is never observable with partial playback fields.
    #[tracing::instrument(skip(self, playback), fields(stream_id = %playback.stream_id))]
    pub async fn update_playback_ready(
        &self,
        asset_id: Uuid,
        playback: &PlaybackMetadata,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE assets
            SET stream_id = $2,
                playback_url = $3,
                thumbnail_url = $4,
                duration_seconds = $5,
                resolution = $6,
                status = 'READY',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(asset_id)
        .bind(&playback.stream_id)
        .bind(&playback.playback_url)
        .bind(&playback.thumbnail_url)
        .bind(playback.duration_seconds)
        .bind(&playback.resolution)
        .execute(&self.pool)
        .await?;

        tracing::info!(asset_id = %asset_id, "Asset playback metadata written, asset READY");

        Ok(())
    }

    /// Mark an asset ERROR after the associated job exhausts its retries.
    /// `error_metadata` carries the failure reason, timestamp, and attempt
    /// count for operators.
    #[tracing::instrument(skip(self, error_metadata))]
    pub async fn mark_error(
        &self,
        asset_id: Uuid,
        error_metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE assets
            SET status = 'ERROR', error_metadata = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(asset_id)
        .bind(error_metadata)
        .execute(&self.pool)
        .await?;

        tracing::error!(asset_id = %asset_id, "Asset marked ERROR");

        Ok(())
    }

    /// Return an errored asset to PROCESSING ahead of a manual re-enqueue.
    #[tracing::instrument(skip(self))]
    pub async fn mark_processing(&self, asset_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE assets
            SET status = 'PROCESSING', error_metadata = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'ERROR'
            "#,
        )
        .bind(asset_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
