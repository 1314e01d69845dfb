//! Configuration module
//!
//! Configuration is loaded from environment variables (with `.env` support via
//! dotenvy). Most values have development defaults; `DATABASE_URL` and the
//! storage/provider credentials are required for a functional deployment.

use std::env;

use anyhow::{Context, Result};

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const QUEUE_MAX_WORKERS: usize = 4;
const QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const QUEUE_BATCH_SIZE: usize = 5;
const QUEUE_MAX_ATTEMPTS: i32 = 3;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,

    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    // Object storage
    pub storage_bucket: String,
    pub storage_region: String,
    pub storage_endpoint: Option<String>,

    // External streaming provider
    pub stream_api_base: String,
    pub stream_account_id: String,
    pub stream_api_token: String,

    // Best-effort downstream processing pipeline (optional)
    pub pipeline_base_url: Option<String>,
    pub app_base_url: String,

    // Transcode queue tuning
    pub queue_max_workers: usize,
    pub queue_poll_interval_ms: u64,
    pub queue_batch_size: usize,
    pub queue_max_attempts: i32,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        // Best-effort .env loading; absence is not an error.
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let storage_bucket = env::var("STORAGE_BUCKET").context("STORAGE_BUCKET is required")?;

        Ok(Self {
            server_port: parse_env("PORT", 8080),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parse_env("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),

            storage_bucket,
            storage_region: env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            storage_endpoint: env::var("STORAGE_ENDPOINT").ok(),

            stream_api_base: env::var("STREAM_API_BASE")
                .unwrap_or_else(|_| "https://api.cloudflare.com/client/v4".to_string()),
            stream_account_id: env::var("STREAM_ACCOUNT_ID").unwrap_or_default(),
            stream_api_token: env::var("STREAM_API_TOKEN").unwrap_or_default(),

            pipeline_base_url: env::var("PROCESSING_API_BASE").ok(),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            queue_max_workers: parse_env("QUEUE_MAX_WORKERS", QUEUE_MAX_WORKERS),
            queue_poll_interval_ms: parse_env("QUEUE_POLL_INTERVAL_MS", QUEUE_POLL_INTERVAL_MS),
            queue_batch_size: parse_env("QUEUE_BATCH_SIZE", QUEUE_BATCH_SIZE),
            queue_max_attempts: parse_env("QUEUE_MAX_ATTEMPTS", QUEUE_MAX_ATTEMPTS),
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}

/// Parse an environment variable, falling back to `default` when the variable
/// is unset or unparseable.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_on_missing() {
        assert_eq!(parse_env("CLIPSTREAM_TEST_UNSET_VAR", 42u32), 42);
    }

    #[test]
    fn parse_env_reads_value() {
        env::set_var("CLIPSTREAM_TEST_SET_VAR", "17");
        assert_eq!(parse_env("CLIPSTREAM_TEST_SET_VAR", 42u32), 17);
        env::remove_var("CLIPSTREAM_TEST_SET_VAR");
    }

    #[test]
    fn parse_env_falls_back_on_garbage() {
        env::set_var("CLIPSTREAM_TEST_BAD_VAR", "not-a-number");
        assert_eq!(parse_env("CLIPSTREAM_TEST_BAD_VAR", 42u32), 42);
        env::remove_var("CLIPSTREAM_TEST_BAD_VAR");
    }
}
