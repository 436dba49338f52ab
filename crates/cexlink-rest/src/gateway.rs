//! REST gateway.
//!
//! Stateless across calls: each request is encoded, optionally signed with
//! a fresh timestamp, sent and mapped to `serde_json::Value` or a
//! `RestError`.

use crate::error::{RestError, RestResult};
use crate::signer::{encode_params, SignatureEngine};
use cexlink_core::{Endpoint, HttpMethod};
use cexlink_telemetry::Metrics;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the public API key.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

#[derive(Debug)]
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_key: String,
    signer: Option<SignatureEngine>,
}

impl RestGateway {
    /// Create a gateway.
    ///
    /// # Arguments
    /// * `base_url` - Exchange REST root (e.g., "https://api.binance.com")
    /// * `api_key` - Public key sent in the `X-MBX-APIKEY` header
    /// * `signer` - Required for signed endpoints only
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        signer: Option<SignatureEngine>,
        timeout: Duration,
    ) -> RestResult<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| RestError::Configuration(format!("Invalid base URL {base_url}: {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            signer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Unsigned request.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        params: Vec<(String, String)>,
    ) -> RestResult<Value> {
        self.send(method, path, params, false).await
    }

    /// Request with `timestamp` and `signature` appended.
    pub async fn execute_signed(
        &self,
        method: HttpMethod,
        path: &str,
        params: Vec<(String, String)>,
    ) -> RestResult<Value> {
        self.send(method, path, params, true).await
    }

    /// Call a variant endpoint.
    pub async fn call(
        &self,
        endpoint: Endpoint,
        params: Vec<(String, String)>,
        signed: bool,
    ) -> RestResult<Value> {
        self.send(endpoint.method, endpoint.path, params, signed)
            .await
    }

    /// Like `call`, but logs and swallows the error.
    pub async fn execute_opt(
        &self,
        endpoint: Endpoint,
        params: Vec<(String, String)>,
        signed: bool,
    ) -> Option<Value> {
        match self.call(endpoint, params, signed).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(
                    method = %endpoint.method,
                    path = endpoint.path,
                    error = %e,
                    "REST request failed"
                );
                None
            }
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        mut params: Vec<(String, String)>,
        signed: bool,
    ) -> RestResult<Value> {
        let result = self.send_inner(method, path, &mut params, signed).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        Metrics::rest_request(path, outcome);
        result
    }

    async fn send_inner(
        &self,
        method: HttpMethod,
        path: &str,
        params: &mut Vec<(String, String)>,
        signed: bool,
    ) -> RestResult<Value> {
        let query = if signed {
            let signer = self.signer.as_ref().ok_or_else(|| {
                RestError::Configuration(format!("{path} requires an API secret"))
            })?;
            signer.sign_params(params)?
        } else {
            encode_params(params)?
        };

        let mut url = format!("{}{}", self.base_url, path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        debug!(%method, path, signed, "Sending REST request");

        let mut request = self.client.request(to_reqwest_method(method), &url);
        if !self.api_key.is_empty() {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RestError::Network(format!("{method} {path}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RestError::Network(format!("{method} {path}: failed to read body: {e}")))?;

        if status != StatusCode::OK {
            let payload = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(RestError::ExchangeApi {
                status: status.as_u16(),
                payload,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| RestError::Decode(format!("{method} {path}: {e}")))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let result = RestGateway::new("not a url", "key", None, DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(RestError::Configuration(_))));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let gateway = RestGateway::new("https://api.binance.com/", "key", None, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(gateway.base_url(), "https://api.binance.com");
    }
}
