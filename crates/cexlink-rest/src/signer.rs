//! HMAC-SHA256 request signing.
//!
//! The signature covers the exact query string that is sent: parameters in
//! insertion order, form-urlencoded `k=v` joined by `&`. `encode_params` is
//! the only encoder, used both here and by the gateway when it builds the URL.

use crate::error::{RestError, RestResult};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the request time in epoch milliseconds.
pub const TIMESTAMP_PARAM: &str = "timestamp";
/// Query parameter carrying the hex signature.
pub const SIGNATURE_PARAM: &str = "signature";

/// Scratch URL whose query serializer does the form encoding.
const ENCODER_BASE: &str = "http://localhost/";

/// Encode parameters as a form-urlencoded query string, preserving order.
pub fn encode_params(params: &[(String, String)]) -> RestResult<String> {
    if params.is_empty() {
        return Ok(String::new());
    }
    let mut url = Url::parse(ENCODER_BASE)
        .map_err(|e| RestError::Configuration(format!("Failed to build query encoder: {e}")))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.query().unwrap_or_default().to_string())
}

/// Current time in epoch milliseconds.
pub fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Signs request payloads with the account secret.
///
/// The secret is zeroized on drop and never printed.
pub struct SignatureEngine {
    secret: Zeroizing<String>,
}

impl SignatureEngine {
    /// # Errors
    /// `RestError::Configuration` if the secret is empty.
    pub fn new(secret: impl Into<String>) -> RestResult<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.trim().is_empty() {
            return Err(RestError::Configuration("API secret is empty".to_string()));
        }
        Ok(Self { secret })
    }

    /// Load the secret from an environment variable.
    pub fn from_env(var_name: &str) -> RestResult<Self> {
        let secret = Zeroizing::new(std::env::var(var_name).map_err(|_| {
            RestError::Configuration(format!("environment variable {var_name} not set"))
        })?);
        Self::new(secret.as_str())
    }

    /// Lowercase hex HMAC-SHA256 of `payload`.
    pub fn sign(&self, payload: &str) -> RestResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| RestError::Configuration(format!("Failed to create HMAC: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Append a fresh `timestamp` and the `signature` over the encoded
    /// parameters. Returns the final query string to send.
    pub fn sign_params(&self, params: &mut Vec<(String, String)>) -> RestResult<String> {
        params.push((TIMESTAMP_PARAM.to_string(), timestamp_ms().to_string()));
        let query = encode_params(params)?;
        let signature = self.sign(&query)?;
        params.push((SIGNATURE_PARAM.to_string(), signature.clone()));
        Ok(format!("{query}&{SIGNATURE_PARAM}={signature}"))
    }
}

impl fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("secret", &"<redacted>")
            .finish()
    }
}
