//! Relay error type and its HTTP mapping.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Everything that can go wrong while relaying a request.
///
/// Each variant maps to exactly one client-visible response; none of them are
/// retried and none of them affect other requests.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The audio request carried no call id. Rejected before any upstream call.
    #[error("missing id")]
    MissingId,

    /// The client's run body was not valid JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// The upstream answered with a non-success status. Relayed unchanged.
    #[error("upstream returned {status}")]
    Upstream {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    /// Network failure, timeout, or body read failure talking to the upstream.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The audio upstream did not send response headers in time.
    #[error("upstream did not respond within {0:?}")]
    Timeout(std::time::Duration),

    /// The upstream answered 2xx with a body that is not JSON.
    #[error("invalid JSON from upstream: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

impl RelayError {
    /// Logs the error against the operation that produced it.
    ///
    /// Failures the relay itself reports as 500 are errors; propagated
    /// upstream statuses and client mistakes are only worth a debug line.
    pub fn log(&self, operation: &'static str) {
        match self {
            RelayError::Upstream { status, .. } => {
                tracing::debug!(operation, %status, "relaying upstream error status");
            }
            RelayError::MissingId | RelayError::InvalidBody(_) => {
                tracing::debug!(operation, error = %self, "rejected client request");
            }
            _ => {
                tracing::error!(operation, error = %self, "relay request failed");
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MissingId => (StatusCode::BAD_REQUEST, "missing id").into_response(),
            RelayError::InvalidBody(e) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": format!("invalid request body: {e}") })),
            )
                .into_response(),
            RelayError::Upstream {
                status,
                content_type,
                body,
            } => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                if let Some(content_type) = content_type {
                    response
                        .headers_mut()
                        .insert(header::CONTENT_TYPE, content_type);
                }
                response
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": other.to_string() })),
            )
                .into_response(),
        }
    }
}
