//! Upload finalization: the transactional core of `complete`.
//!
//! The storage-side multipart completion cannot be rolled back, so the local
//! writes — flipping the session to COMPLETED and creating the asset — happen
//! in one database transaction. A crash between storage completion and this
//! transaction leaves an IN_PROGRESS session whose object already exists; the
//! caller logs that loudly for operator repair. Queueing the transcode job
//! happens after this transaction through the queue's idempotent enqueue.

use clipstream_core::models::{Asset, NewAsset};
use clipstream_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::asset::ASSET_COLUMNS;

/// Cross-table writes for upload completion.
#[derive(Clone)]
pub struct IngestRepository {
    pool: PgPool,
}

impl IngestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomically mark the session COMPLETED and create the asset.
    ///
    /// Fails with a session-state error if the session is no longer
    /// IN_PROGRESS (e.g. a concurrent `complete` won the race); in that case
    /// nothing is written.
    #[tracing::instrument(skip(self, asset), fields(asset_type = %asset.asset_type))]
    pub async fn finalize_upload(
        &self,
        session_id: Uuid,
        uploaded_part_numbers: &[i32],
        asset: NewAsset,
    ) -> Result<Asset, AppError> {
        let mut tx = self.pool.begin().await?;

        let completed = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'COMPLETED',
                uploaded_part_numbers = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'IN_PROGRESS'
            "#,
        )
        .bind(session_id)
        .bind(uploaded_part_numbers)
        .execute(&mut *tx)
        .await?;

        if completed.rows_affected() == 0 {
            return Err(AppError::SessionState(format!(
                "Upload session {} is no longer in progress",
                session_id
            )));
        }

        let initial_status = asset.initial_status();
        let created: Asset = sqlx::query_as::<Postgres, Asset>(&format!(
            r#"
            INSERT INTO assets (
                asset_type, title, filename, original_size_bytes, status,
                storage_key, storage_bucket, mime_type, owner_id, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(asset.asset_type.to_string())
        .bind(&asset.title)
        .bind(&asset.filename)
        .bind(asset.original_size_bytes)
        .bind(initial_status.to_string())
        .bind(&asset.storage_key)
        .bind(&asset.storage_bucket)
        .bind(&asset.mime_type)
        .bind(asset.owner_id)
        .bind(&asset.metadata)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            session_id = %session_id,
            asset_id = %created.id,
            "Upload finalized"
        );

        Ok(created)
    }
}
