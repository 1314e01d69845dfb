//! External streaming provider client.
//!
//! The provider pulls the source from a presigned download URL (`ingest`) and
//! exposes finalized playback metadata on a details endpoint (`get_details`).
//! A details response with `ready_to_stream = false` is not an error at this
//! layer; the worker classifies it and lets the queue retry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;
use uuid::Uuid;

/// Correlation metadata attached to an ingest request.
#[derive(Debug, Clone)]
pub struct IngestMeta {
    pub asset_id: Uuid,
    pub name: String,
}

/// Playback state reported by the provider's details endpoint.
#[derive(Debug, Clone)]
pub struct StreamDetails {
    pub ready: bool,
    pub playback_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub resolution: Option<String>,
}

/// Streaming provider abstraction.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Submit a source URL for ingestion; returns the provider's opaque
    /// stream handle.
    async fn ingest(&self, source_url: &str, meta: &IngestMeta) -> Result<String>;

    /// Fetch playback details for a previously ingested stream.
    async fn get_details(&self, handle: &str) -> Result<StreamDetails>;
}

/// HTTP implementation against a Cloudflare-Stream-shaped API.
pub struct HttpStreamProvider {
    http_client: reqwest::Client,
    api_base: String,
    account_id: String,
    api_token: String,
}

impl Debug for HttpStreamProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("HttpStreamProvider")
            .field("api_base", &self.api_base)
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl HttpStreamProvider {
    pub fn new(api_base: String, account_id: String, api_token: String) -> Result<Self> {
        if account_id.is_empty() || api_token.is_empty() {
            anyhow::bail!("Stream provider account id and API token are required");
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client for stream provider")?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            account_id,
            api_token,
        })
    }

    fn stream_url(&self, suffix: &str) -> String {
        format!(
            "{}/accounts/{}/stream{}",
            self.api_base, self.account_id, suffix
        )
    }
}

#[async_trait]
impl StreamProvider for HttpStreamProvider {
    #[tracing::instrument(skip(self, source_url), fields(asset_id = %meta.asset_id))]
    async fn ingest(&self, source_url: &str, meta: &IngestMeta) -> Result<String> {
        let body = serde_json::json!({
            "url": source_url,
            "meta": {
                "assetId": meta.asset_id,
                "name": meta.name,
            },
            "requireSignedURLs": false,
            "thumbnailTimestampPct": 0.1,
        });

        let response = self
            .http_client
            .post(self.stream_url("/copy"))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .context("Failed to reach stream provider ingest endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Stream provider ingest failed: {} - {}", status, error_text);
        }

        let parsed: ApiEnvelope<CopyResult> = response
            .json()
            .await
            .context("Failed to parse ingest response")?;

        let result = parsed.into_result().context("Stream provider rejected ingest")?;

        tracing::info!(stream_id = %result.uid, "Stream ingest accepted");

        Ok(result.uid)
    }

    #[tracing::instrument(skip(self))]
    async fn get_details(&self, handle: &str) -> Result<StreamDetails> {
        let response = self
            .http_client
            .get(self.stream_url(&format!("/{}", handle)))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .context("Failed to reach stream provider details endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!(
                "Stream provider details fetch failed: {} - {}",
                status,
                error_text
            );
        }

        let parsed: ApiEnvelope<DetailsResult> = response
            .json()
            .await
            .context("Failed to parse details response")?;

        let result = parsed
            .into_result()
            .context("Stream provider rejected details fetch")?;

        Ok(result.into_details())
    }
}

/// `{success, result, errors}` envelope used by the provider API.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl<T> ApiEnvelope<T> {
    fn into_result(self) -> Result<T> {
        if !self.success {
            anyhow::bail!("Provider API error: {}", serde_json::json!(self.errors));
        }
        self.result
            .ok_or_else(|| anyhow::anyhow!("Provider API returned success without a result"))
    }
}

#[derive(Debug, Deserialize)]
struct CopyResult {
    uid: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    #[serde(rename = "readyToStream", default)]
    ready_to_stream: bool,
    playback: Option<PlaybackUrls>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    input: Option<InputInfo>,
}

#[derive(Debug, Deserialize)]
struct PlaybackUrls {
    hls: Option<String>,
    dash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InputInfo {
    width: Option<i64>,
    height: Option<i64>,
}

impl DetailsResult {
    fn into_details(self) -> StreamDetails {
        // Negative dimensions mean the provider has not probed the input yet.
        let resolution = self.input.as_ref().and_then(|input| {
            match (input.width, input.height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => Some(format!("{}x{}", w, h)),
                _ => None,
            }
        });

        StreamDetails {
            ready: self.ready_to_stream,
            playback_url: self
                .playback
                .and_then(|p| p.hls.or(p.dash))
                .filter(|u| !u.is_empty()),
            thumbnail_url: self.thumbnail.filter(|u| !u.is_empty()),
            duration_seconds: self.duration.filter(|d| *d >= 0.0),
            resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_copy_response() {
        let body = serde_json::json!({
            "success": true,
            "result": {"uid": "stream-abc123"},
            "errors": []
        });
        let envelope: ApiEnvelope<CopyResult> = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.into_result().unwrap().uid, "stream-abc123");
    }

    #[test]
    fn rejects_unsuccessful_envelope() {
        let body = serde_json::json!({
            "success": false,
            "result": null,
            "errors": [{"code": 10005, "message": "rate limited"}]
        });
        let envelope: ApiEnvelope<CopyResult> = serde_json::from_value(body).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn parses_ready_details() {
        let body = serde_json::json!({
            "success": true,
            "result": {
                "readyToStream": true,
                "playback": {
                    "hls": "https://cdn.example.com/abc/manifest/video.m3u8",
                    "dash": "https://cdn.example.com/abc/manifest/video.mpd"
                },
                "thumbnail": "https://cdn.example.com/abc/thumbnails/thumbnail.jpg",
                "duration": 93.5,
                "input": {"width": 1920, "height": 1080}
            }
        });
        let envelope: ApiEnvelope<DetailsResult> = serde_json::from_value(body).unwrap();
        let details = envelope.into_result().unwrap().into_details();
        assert!(details.ready);
        assert_eq!(
            details.playback_url.as_deref(),
            Some("https://cdn.example.com/abc/manifest/video.m3u8")
        );
        assert_eq!(details.resolution.as_deref(), Some("1920x1080"));
        assert_eq!(details.duration_seconds, Some(93.5));
    }

    #[test]
    fn parses_pending_details() {
        // Before processing finishes the provider reports duration -1 and no
        // playback block.
        let body = serde_json::json!({
            "success": true,
            "result": {
                "readyToStream": false,
                "playback": null,
                "thumbnail": "",
                "duration": -1.0,
                "input": {"width": -1, "height": -1}
            }
        });
        let envelope: ApiEnvelope<DetailsResult> = serde_json::from_value(body).unwrap();
        let details = envelope.into_result().unwrap().into_details();
        assert!(!details.ready);
        assert!(details.playback_url.is_none());
        assert!(details.thumbnail_url.is_none());
        assert!(details.duration_seconds.is_none());
        assert!(details.resolution.is_none());
    }

    #[test]
    fn falls_back_to_dash_when_no_hls() {
        let body = serde_json::json!({
            "success": true,
            "result": {
                "readyToStream": true,
                "playback": {"hls": null, "dash": "https://cdn.example.com/abc.mpd"},
                "thumbnail": "https://cdn.example.com/t.jpg",
                "duration": 10.0,
                "input": {"width": 640, "height": 360}
            }
        });
        let envelope: ApiEnvelope<DetailsResult> = serde_json::from_value(body).unwrap();
        let details = envelope.into_result().unwrap().into_details();
        assert_eq!(
            details.playback_url.as_deref(),
            Some("https://cdn.example.com/abc.mpd")
        );
    }

    #[test]
    fn new_requires_credentials() {
        assert!(HttpStreamProvider::new(
            "https://api.example.com/v4".to_string(),
            String::new(),
            "token".to_string()
        )
        .is_err());
        assert!(HttpStreamProvider::new(
            "https://api.example.com/v4".to_string(),
            "account".to_string(),
            String::new()
        )
        .is_err());
    }
}
