//! Best-effort notification to the external processing pipeline.
//!
//! Fired after the transactional core of `complete` succeeds. Failure is
//! logged and never retried here; the transcode queue is the durable retry
//! path for the work that matters.

use std::time::Duration;

use anyhow::{Context, Result};
use uuid::Uuid;

#[derive(Clone)]
pub struct PipelineNotifier {
    http_client: reqwest::Client,
    pipeline_base_url: Option<String>,
    app_base_url: String,
}

impl PipelineNotifier {
    pub fn new(pipeline_base_url: Option<String>, app_base_url: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client for pipeline notifier")?;

        Ok(Self {
            http_client,
            pipeline_base_url: pipeline_base_url.map(|u| u.trim_end_matches('/').to_string()),
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Dispatch a fire-and-forget ingestion notice for a video asset.
    /// Returns immediately; the request runs on its own task.
    pub fn notify_video_ingested(&self, asset_id: Uuid) {
        let Some(ref base) = self.pipeline_base_url else {
            tracing::debug!(asset_id = %asset_id, "No processing pipeline configured, skipping notify");
            return;
        };

        let url = format!("{}/process-from-api", base);
        let body = serde_json::json!({
            "asset_id": asset_id,
            "asset_type": "VIDEO",
            "api_url": format!("{}/api/v0/assets/{}/download", self.app_base_url, asset_id),
        });

        let client = self.http_client.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    tracing::warn!(
                        asset_id = %asset_id,
                        status = %status,
                        body = %text,
                        "Processing pipeline rejected ingestion notice"
                    );
                }
                Ok(_) => {
                    tracing::debug!(asset_id = %asset_id, "Processing pipeline notified");
                }
                Err(e) => {
                    tracing::warn!(
                        asset_id = %asset_id,
                        error = %e,
                        "Failed to notify processing pipeline"
                    );
                }
            }
        });
    }
}
