use chrono::{DateTime, Utc};
use clipstream_core::models::UploadSession;
use clipstream_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const SESSION_COLUMNS: &str = r#"
    id, external_upload_id, object_key, file_name, file_size_bytes, mime_type,
    total_parts, uploaded_part_numbers, status, owner_id, campaign_id,
    metadata, expires_at, created_at, updated_at
"#;

/// Repository for multipart upload sessions
#[derive(Clone)]
pub struct UploadSessionRepository {
    pool: PgPool,
}

impl UploadSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new upload session in IN_PROGRESS.
    #[tracing::instrument(skip(self, metadata))]
    #[allow(clippy::too_many_arguments)]
    pub async fn create_session(
        &self,
        external_upload_id: String,
        object_key: String,
        file_name: String,
        file_size_bytes: i64,
        mime_type: String,
        total_parts: i32,
        owner_id: Uuid,
        campaign_id: Option<String>,
        metadata: Option<serde_json::Value>,
        expires_at: DateTime<Utc>,
    ) -> Result<UploadSession, AppError> {
        let session: UploadSession = sqlx::query_as::<Postgres, UploadSession>(&format!(
            r#"
            INSERT INTO upload_sessions (
                external_upload_id, object_key, file_name, file_size_bytes,
                mime_type, total_parts, status, owner_id, campaign_id,
                metadata, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'IN_PROGRESS', $7, $8, $9, $10)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(external_upload_id)
        .bind(object_key)
        .bind(file_name)
        .bind(file_size_bytes)
        .bind(mime_type)
        .bind(total_parts)
        .bind(owner_id)
        .bind(campaign_id)
        .bind(metadata)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            session_id = %session.id,
            object_key = %session.object_key,
            total_parts = session.total_parts,
            "Upload session created"
        );

        Ok(session)
    }

    /// Get a session by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_session(&self, session_id: Uuid) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<Postgres, UploadSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM upload_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Mark a session EXPIRED. Expiry is evaluated lazily at completion time;
    /// the guard on status keeps terminal states from reverting.
    #[tracing::instrument(skip(self))]
    pub async fn mark_expired(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'EXPIRED', updated_at = NOW()
            WHERE id = $1 AND status = 'IN_PROGRESS'
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        tracing::warn!(session_id = %session_id, "Upload session expired");

        Ok(())
    }
}
