//! Call relay server library logic.
//!
//! Sits between a browser front end and an upstream workflow webhook. Call
//! listings are normalized into [`callrelay_types::CanonicalCallRecord`]s and
//! cached briefly; audio is streamed straight through.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod upstream;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use cache::ResultCache;
use config::{Config, ConfigError};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use upstream::UpstreamClient;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Last normalized call listing.
    pub cache: ResultCache,
    /// Client for the webhook and audio endpoint.
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Builds the state from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if an upstream URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            cache: ResultCache::new(config.cache.ttl()),
            upstream: UpstreamClient::new(&config.upstream)?,
        })
    }
}

/// Maximum request body size (1 MiB) for forwarded webhook runs.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/calls", get(api::list_calls_handler))
        .route("/api/run", post(api::run_webhook_handler))
        .route("/api/audio", get(api::missing_audio_id_handler))
        .route("/api/audio/", get(api::missing_audio_id_handler))
        .route("/api/audio/{id}", get(api::stream_audio_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
