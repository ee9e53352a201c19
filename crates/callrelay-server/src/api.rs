//! API handlers for the relay.

use crate::error::RelayError;
use crate::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Extension, Path, Query},
    http::{HeaderMap, HeaderName},
    response::Response,
    Json,
};
use callrelay_types::{normalize_response, CanonicalCallRecord};
use futures_util::TryStreamExt;
use std::sync::Arc;

/// Headers that describe the upstream connection rather than the payload.
/// The outbound connection sets its own.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Handler for `GET /api/calls`.
///
/// Serves the cached listing while it is fresh. On a miss, forwards the
/// client's query parameters to the webhook, normalizes the answer and
/// replaces the cached listing with it.
pub async fn list_calls_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<CanonicalCallRecord>>, RelayError> {
    if let Some(listing) = state.cache.get() {
        tracing::debug!(records = listing.records.len(), "call listing cache hit");
        return Ok(Json(listing.records.clone()));
    }

    tracing::debug!("call listing cache miss");
    let payload = state
        .upstream
        .list_calls(&params)
        .await
        .inspect_err(|e| e.log("GET /api/calls"))?;

    let records = normalize_response(&payload);
    state.cache.set(records.clone());
    Ok(Json(records))
}

/// Handler for `POST /api/run`.
///
/// Forwards the client's JSON body to the webhook and returns the normalized
/// answer. Running the workflow has side effects, so the cache is neither
/// read nor written.
pub async fn run_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Vec<CanonicalCallRecord>>, RelayError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        Bytes::from_static(b"{}")
    } else {
        serde_json::from_slice::<serde::de::IgnoredAny>(&body)
            .map_err(RelayError::InvalidBody)
            .inspect_err(|e| e.log("POST /api/run"))?;
        body
    };

    let payload = state
        .upstream
        .run_webhook(body)
        .await
        .inspect_err(|e| e.log("POST /api/run"))?;

    Ok(Json(normalize_response(&payload)))
}

/// Handler for `GET /api/audio/{id}`.
///
/// Streams the upstream audio through unchanged: status, headers (minus
/// hop-by-hop ones) and body bytes, without buffering the payload.
pub async fn stream_audio_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, RelayError> {
    if id.is_empty() {
        let err = RelayError::MissingId;
        err.log("GET /api/audio");
        return Err(err);
    }

    let upstream = state
        .upstream
        .fetch_audio(&id)
        .await
        .inspect_err(|e| e.log("GET /api/audio"))?;

    let status = upstream.status();
    let mut headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers() {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let stream = upstream.bytes_stream().inspect_err(move |e| {
        tracing::warn!(operation = "GET /api/audio", id = %id, error = %e, "audio stream interrupted");
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Handler for `GET /api/audio` and `GET /api/audio/` with no id segment.
pub async fn missing_audio_id_handler() -> RelayError {
    RelayError::MissingId
}
