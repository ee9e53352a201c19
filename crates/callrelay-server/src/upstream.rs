//! HTTP client for the upstream webhook and audio endpoint.
//!
//! Every call here is a single forwarded request with no retries. Webhook
//! calls are bounded end to end. Audio is only bounded until the upstream
//! sends its headers: the body is streamed to the client for as long as the
//! recording takes to transfer.

use axum::{body::Bytes, http::header};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::{ConfigError, UpstreamConfig};
use crate::error::RelayError;

/// Shared upstream client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    webhook_url: Url,
    audio_url: String,
    timeout: Duration,
}

/// The client only bounds connection setup. Per-request limits are applied
/// by each call, since a whole-client timeout would also cut off streamed
/// audio bodies.
fn build_http_client(connect_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("callrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

impl UpstreamClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the webhook or audio URL does
    /// not parse.
    pub fn new(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let (webhook_url, audio_url) = config.validated_urls()?;
        Ok(Self {
            http: build_http_client(config.timeout()),
            webhook_url,
            audio_url,
            timeout: config.timeout(),
        })
    }

    /// `GET` the webhook with the client's query parameters copied onto it.
    pub async fn list_calls(&self, params: &[(String, String)]) -> Result<Value, RelayError> {
        let url = with_query_params(&self.webhook_url, params);
        tracing::debug!(%url, "fetching call listing from webhook");
        let response = self.http.get(url).timeout(self.timeout).send().await?;
        read_json(ensure_success(response).await?).await
    }

    /// `POST` a JSON body to the webhook verbatim.
    pub async fn run_webhook(&self, body: Bytes) -> Result<Value, RelayError> {
        let response = self
            .http
            .post(self.webhook_url.clone())
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }

    /// `GET` the audio for a call. The body is left unread for streaming.
    ///
    /// The timeout covers the wait for response headers only.
    pub async fn fetch_audio(&self, id: &str) -> Result<reqwest::Response, RelayError> {
        let url = audio_url_for(&self.audio_url, id);
        tracing::debug!(%url, "fetching call audio");
        let response = tokio::time::timeout(self.timeout, self.http.get(url).send())
            .await
            .map_err(|_| RelayError::Timeout(self.timeout))??;
        ensure_success(response).await
    }
}

/// Copies client query parameters onto `base`.
///
/// A client key replaces every existing pair with the same name, so the
/// configured URL's own parameters survive unless the client overrides them.
pub fn with_query_params(base: &Url, params: &[(String, String)]) -> Url {
    let mut url = base.clone();
    if params.is_empty() {
        return url;
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (key, value) in params {
        pairs.retain(|(existing, _)| existing != key);
        pairs.push((key.clone(), value.clone()));
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}

/// Appends the URL-escaped id to the configured audio prefix.
pub fn audio_url_for(prefix: &str, id: &str) -> String {
    format!("{prefix}{}", urlencoding::encode(id))
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let body = response.bytes().await?;
    Err(RelayError::Upstream {
        status,
        content_type,
        body,
    })
}

async fn read_json(response: reqwest::Response) -> Result<Value, RelayError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(RelayError::InvalidJson)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_params_leaves_url_untouched() {
        let base = Url::parse("https://hooks.test/webhook/abc").unwrap();
        assert_eq!(with_query_params(&base, &[]).as_str(), "https://hooks.test/webhook/abc");
    }

    #[test]
    fn params_are_appended() {
        let base = Url::parse("https://hooks.test/webhook").unwrap();
        let url = with_query_params(&base, &params(&[("limit", "10"), ("q", "a b")]));
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, params(&[("limit", "10"), ("q", "a b")]));
    }

    #[test]
    fn client_params_replace_configured_ones() {
        let base = Url::parse("https://hooks.test/webhook?limit=5&tenant=x").unwrap();
        let url = with_query_params(&base, &params(&[("limit", "50")]));
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, params(&[("tenant", "x"), ("limit", "50")]));
    }

    #[test]
    fn repeated_client_keys_keep_the_last_value() {
        let base = Url::parse("https://hooks.test/webhook").unwrap();
        let url = with_query_params(&base, &params(&[("page", "1"), ("page", "2")]));
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, params(&[("page", "2")]));
    }

    #[test]
    fn audio_id_is_escaped() {
        assert_eq!(
            audio_url_for("https://hooks.test/get-audio?conversation_id=", "conv 1/2&x"),
            "https://hooks.test/get-audio?conversation_id=conv%201%2F2%26x"
        );
    }

    #[test]
    fn invalid_webhook_url_is_rejected() {
        let config = UpstreamConfig {
            webhook_url: "not a url".to_string(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            UpstreamClient::new(&config),
            Err(ConfigError::InvalidUrl { field: "upstream.webhook_url", .. })
        ));
    }

    #[tokio::test]
    async fn audio_headers_wait_is_bounded() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = UpstreamClient::new(&UpstreamConfig {
            webhook_url: format!("http://{addr}/webhook"),
            audio_url: format!("http://{addr}/audio?id="),
            timeout_secs: 1,
        })
        .unwrap();

        let err = client.fetch_audio("silent").await.unwrap_err();
        assert!(matches!(err, RelayError::Timeout(_)), "{err}");
    }
}
