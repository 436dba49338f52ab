//! REST error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    /// DNS failure, timeout, refused connection or truncated body.
    #[error("Network error: {0}")]
    Network(String),

    /// Exchange answered with a non-200 status.
    #[error("Exchange API error (HTTP {status}): {payload}")]
    ExchangeApi {
        status: u16,
        /// Parsed JSON body, or the raw text as a JSON string.
        payload: serde_json::Value,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl RestError {
    /// Short label used as a metrics outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::ExchangeApi { .. } => "api_error",
            Self::Configuration(_) => "config_error",
            Self::Decode(_) => "decode_error",
        }
    }
}

pub type RestResult<T> = Result<T, RestError>;
