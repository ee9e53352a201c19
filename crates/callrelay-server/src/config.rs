//! Relay configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream webhook and audio endpoints.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Listing cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where the relay forwards requests.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Workflow webhook that lists calls (GET) and runs the workflow (POST).
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// Audio endpoint prefix. The URL-escaped call id is appended verbatim,
    /// so this normally ends with the query key, e.g. `?conversation_id=`.
    #[serde(default = "default_audio_url")]
    pub audio_url: String,

    /// Upper bound on a webhook call, and on the wait for audio response
    /// headers, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Listing cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched listing is served without contacting the webhook.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "callrelay_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    4000
}

fn default_webhook_url() -> String {
    "https://ahmedgomaaseekers.app.n8n.cloud/webhook/c0ddafb0-ea84-4585-8d42-d4ce91d15980"
        .to_string()
}

fn default_audio_url() -> String {
    "https://ahmedgomaaseekers.app.n8n.cloud/webhook/get-audio?conversation_id=".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            webhook_url: default_webhook_url(),
            audio_url: default_audio_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parses the webhook URL and checks that the audio prefix is a URL.
    ///
    /// The audio prefix is returned as-is since ids are appended to it
    /// textually.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] naming the offending field.
    pub fn validated_urls(&self) -> Result<(Url, String), ConfigError> {
        let webhook_url = Url::parse(&self.webhook_url).map_err(|source| ConfigError::InvalidUrl {
            field: "upstream.webhook_url",
            source,
        })?;
        Url::parse(&self.audio_url).map_err(|source| ConfigError::InvalidUrl {
            field: "upstream.audio_url",
            source,
        })?;
        Ok((webhook_url, self.audio_url.clone()))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An upstream URL does not parse.
    #[error("invalid {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies overrides from the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies environment overrides using `lookup` to read variables.
///
/// - `CALLRELAY_HOST` overrides `server.host`
/// - `PORT` overrides `server.port`
/// - `WEBHOOK_URL` overrides `upstream.webhook_url`
/// - `AUDIO_URL` overrides `upstream.audio_url`
/// - `CALLRELAY_UPSTREAM_TIMEOUT_SECS` overrides `upstream.timeout_secs`
/// - `CACHE_TTL_SECONDS` overrides `cache.ttl_secs`
/// - `CALLRELAY_LOG_LEVEL` overrides `logging.level`
/// - `CALLRELAY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(parsed) = lookup("CALLRELAY_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = lookup("PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(url) = lookup("WEBHOOK_URL").filter(|v| !v.trim().is_empty()) {
        config.upstream.webhook_url = url;
    }
    if let Some(url) = lookup("AUDIO_URL").filter(|v| !v.trim().is_empty()) {
        config.upstream.audio_url = url;
    }
    if let Some(parsed) = lookup("CALLRELAY_UPSTREAM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.upstream.timeout_secs = parsed;
    }
    if let Some(parsed) = lookup("CACHE_TTL_SECONDS").and_then(|v| v.parse().ok()) {
        config.cache.ttl_secs = parsed;
    }
    if let Some(level) = lookup("CALLRELAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("CALLRELAY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
