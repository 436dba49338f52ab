//! Application configuration.

use crate::error::{AppError, AppResult};
use cexlink_core::ExchangeVariant;
use cexlink_ws::{SessionConfig, DEFAULT_BATCH_LIMIT};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable read for the API secret when none is configured.
pub const DEFAULT_SECRET_ENV: &str = "CEXLINK_API_SECRET";

/// Streaming configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Wait between a drop and the next connection attempt (ms).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Book ticker kept subscribed on every open.
    #[serde(default)]
    pub default_book_symbol: Option<String>,
    /// Maximum pairs per subscribe message.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    /// Book tickers subscribed at startup.
    #[serde(default)]
    pub book_symbols: Vec<String>,
    /// Trade streams subscribed at startup.
    #[serde(default)]
    pub trade_symbols: Vec<String>,
}

fn default_reconnect_delay_ms() -> u64 {
    2_000
}

fn default_batch_limit() -> usize {
    DEFAULT_BATCH_LIMIT
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            default_book_symbol: None,
            batch_limit: default_batch_limit(),
            book_symbols: Vec::new(),
            trade_symbols: Vec::new(),
        }
    }
}

/// Main application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Exchange payload layout.
    #[serde(default)]
    pub variant: ExchangeVariant,
    /// Use the variant's test network URLs.
    #[serde(default)]
    pub testnet: bool,
    /// REST root override.
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Stream URL override.
    #[serde(default)]
    pub stream_url: Option<String>,
    /// Public API key.
    #[serde(default)]
    pub api_key: String,
    /// API secret. Prefer `api_secret_env` outside of local testing.
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Environment variable holding the API secret.
    #[serde(default = "default_api_secret_env")]
    pub api_secret_env: String,
    /// Per-request REST timeout (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Streaming session settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

fn default_api_secret_env() -> String {
    DEFAULT_SECRET_ENV.to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject configurations the connector cannot start with.
    pub fn validate(&self) -> AppResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config("api_key is empty".to_string()));
        }
        self.api_secret()?;

        if let Some(url) = &self.rest_url {
            check_url("rest_url", url, &["http", "https"])?;
        }
        if let Some(url) = &self.stream_url {
            check_url("stream_url", url, &["ws", "wss"])?;
        }

        if self.stream.batch_limit == 0 || self.stream.batch_limit > DEFAULT_BATCH_LIMIT {
            return Err(AppError::Config(format!(
                "stream.batch_limit must be between 1 and {DEFAULT_BATCH_LIMIT}"
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(AppError::Config("request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Configured secret, else the value of `api_secret_env`.
    pub fn api_secret(&self) -> AppResult<String> {
        let secret = match &self.api_secret {
            Some(secret) => secret.clone(),
            None => std::env::var(&self.api_secret_env).map_err(|_| {
                AppError::Config(format!(
                    "No api_secret configured and {} is not set",
                    self.api_secret_env
                ))
            })?,
        };
        if secret.trim().is_empty() {
            return Err(AppError::Config("API secret is empty".to_string()));
        }
        Ok(secret)
    }

    pub fn rest_base_url(&self) -> String {
        self.rest_url
            .clone()
            .unwrap_or_else(|| self.variant.rest_base_url(self.testnet).to_string())
    }

    pub fn stream_url(&self) -> String {
        self.stream_url
            .clone()
            .unwrap_or_else(|| self.variant.stream_url(self.testnet).to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(self.stream_url(), self.variant);
        session.reconnect_delay = Duration::from_millis(self.stream.reconnect_delay_ms);
        session.default_book_symbol = self.stream.default_book_symbol.clone();
        session.batch_limit = self.stream.batch_limit;
        session
    }
}

fn check_url(field: &str, url: &str, schemes: &[&str]) -> AppResult<()> {
    let parsed =
        Url::parse(url).map_err(|e| AppError::Config(format!("{field} is not a valid URL: {e}")))?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(AppError::Config(format!(
            "{field} must use one of {schemes:?}, got {}",
            parsed.scheme()
        )));
    }
    Ok(())
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("variant", &self.variant)
            .field("testnet", &self.testnet)
            .field("rest_url", &self.rest_url)
            .field("stream_url", &self.stream_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("api_secret_env", &self.api_secret_env)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("stream", &self.stream)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            variant: ExchangeVariant::default(),
            testnet: false,
            rest_url: None,
            stream_url: None,
            api_key: String::new(),
            api_secret: None,
            api_secret_env: default_api_secret_env(),
            request_timeout_ms: default_request_timeout_ms(),
            stream: StreamConfig::default(),
        }
    }
}
