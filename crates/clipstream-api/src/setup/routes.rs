//! Route configuration and setup.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use clipstream_core::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// All request bodies are JSON envelopes; file bytes never pass through this
/// service.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router> {
    let cors = setup_cors(config)?;

    let api_routes = Router::new()
        .route("/upload/start", post(handlers::upload_start::start_upload))
        .route(
            "/upload/complete",
            post(handlers::upload_complete::complete_upload),
        )
        .route("/queue/stats", get(handlers::queue_admin::queue_stats))
        .route("/queue/process", post(handlers::queue_admin::process_queue))
        .route(
            "/queue/requeue/{asset_id}",
            post(handlers::queue_admin::requeue_failed),
        );

    let router = Router::new()
        .nest("/api/v0", api_routes)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route(
            "/api/docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = if config.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect();
        CorsLayer::new().allow_origin(origins?)
    };

    Ok(cors
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any))
}
