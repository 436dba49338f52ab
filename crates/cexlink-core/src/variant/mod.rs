//! Exchange variant selection and per-variant payload mapping.
//!
//! Each variant keeps its endpoints, request field names, entity parsers
//! and stream canonicalization in its own module (`primary`, `alternate`).
//! Callers only ever go through `ExchangeVariant`.

mod alternate;
mod primary;

use crate::{
    Balance, Candle, Channel, Contract, Fill, OrderRequest, OrderStatus, Price, StreamEvent,
    Timeframe,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Supported exchange variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeVariant {
    /// Crypto.com-style payloads (`result`/`data` envelopes, snake_case fields).
    #[default]
    Primary,
    /// Binance-style payloads (camelCase fields, `filters`, legacy streams).
    Alternate,
}

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// REST endpoint: method plus path relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: &'static str,
}

/// REST endpoints used by the connector.
#[derive(Debug)]
pub struct Endpoints {
    pub instruments: Endpoint,
    pub book_ticker: Endpoint,
    pub candles: Endpoint,
    pub balances: Endpoint,
    pub place_order: Endpoint,
    pub cancel_order: Endpoint,
    pub order_status: Endpoint,
    pub fills: Endpoint,
}

impl ExchangeVariant {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Alternate => "alternate",
        }
    }

    /// REST base URL, optionally the test network.
    pub fn rest_base_url(&self, testnet: bool) -> &'static str {
        match self {
            Self::Primary => primary::rest_base_url(testnet),
            Self::Alternate => alternate::rest_base_url(testnet),
        }
    }

    /// Streaming endpoint URL, optionally the test network.
    pub fn stream_url(&self, testnet: bool) -> &'static str {
        match self {
            Self::Primary => primary::stream_url(testnet),
            Self::Alternate => alternate::stream_url(testnet),
        }
    }

    pub fn endpoints(&self) -> &'static Endpoints {
        match self {
            Self::Primary => &primary::ENDPOINTS,
            Self::Alternate => &alternate::ENDPOINTS,
        }
    }

    // ------------------------------------------------------------------
    // Entity parsers
    // ------------------------------------------------------------------

    /// Parse the instrument list. Malformed records are skipped.
    pub fn parse_contracts(&self, body: &Value) -> Vec<Contract> {
        let records = match self {
            Self::Primary => primary::contract_records(body),
            Self::Alternate => alternate::contract_records(body),
        };

        let mut contracts = Vec::with_capacity(records.len());
        for raw in records {
            let parsed = match self {
                Self::Primary => primary::parse_contract(raw),
                Self::Alternate => alternate::parse_contract(raw),
            };
            match parsed {
                Some(contract) => contracts.push(contract),
                None => warn!(variant = self.name(), %raw, "Skipping malformed instrument record"),
            }
        }
        contracts
    }

    /// Parse a balance response into a map keyed by asset.
    pub fn parse_balances(&self, body: &Value) -> HashMap<String, Balance> {
        match self {
            Self::Primary => primary::parse_balances(body),
            Self::Alternate => alternate::parse_balances(body),
        }
    }

    /// Parse an order response (place, cancel or status query).
    pub fn parse_order_status(&self, body: &Value) -> Option<OrderStatus> {
        let status = match self {
            Self::Primary => primary::parse_order_status(body),
            Self::Alternate => alternate::parse_order_status(body),
        };
        if status.is_none() {
            warn!(variant = self.name(), %body, "Unrecognized order payload");
        }
        status
    }

    /// Parse account fills, keeping only those of `order_id`.
    pub fn parse_fills(&self, body: &Value, order_id: &str) -> Vec<Fill> {
        let fills = match self {
            Self::Primary => primary::parse_fills(body),
            Self::Alternate => alternate::parse_fills(body),
        };
        fills
            .into_iter()
            .filter(|fill| fill.order_id == order_id)
            .collect()
    }

    /// Parse historical candles, sorted by ascending timestamp.
    pub fn parse_candles(&self, body: &Value, timeframe: Timeframe) -> Vec<Candle> {
        let mut candles = match self {
            Self::Primary => primary::parse_candles(body, timeframe),
            Self::Alternate => alternate::parse_candles(body, timeframe),
        };
        candles.sort_by_key(|c| c.timestamp);
        candles
    }

    /// Parse a best bid/ask snapshot for `symbol`.
    pub fn parse_book_snapshot(&self, body: &Value, symbol: &str) -> Option<(Price, Price)> {
        match self {
            Self::Primary => primary::parse_book_snapshot(body, symbol),
            Self::Alternate => alternate::parse_book_snapshot(body, symbol),
        }
    }

    // ------------------------------------------------------------------
    // Request parameters
    // ------------------------------------------------------------------

    pub fn order_params(&self, request: &OrderRequest) -> Vec<(String, String)> {
        match self {
            Self::Primary => primary::order_params(request),
            Self::Alternate => alternate::order_params(request),
        }
    }

    /// Parameters identifying an existing order (cancel, status).
    pub fn order_id_params(&self, symbol: &str, order_id: &str) -> Vec<(String, String)> {
        match self {
            Self::Primary => primary::order_id_params(symbol, order_id),
            Self::Alternate => alternate::order_id_params(symbol, order_id),
        }
    }

    pub fn fills_params(&self, symbol: &str, order_id: &str) -> Vec<(String, String)> {
        match self {
            Self::Primary => primary::fills_params(symbol, order_id),
            Self::Alternate => alternate::fills_params(symbol, order_id),
        }
    }

    pub fn candle_params(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Vec<(String, String)> {
        match self {
            Self::Primary => primary::candle_params(symbol, timeframe, limit),
            Self::Alternate => alternate::candle_params(symbol, timeframe, limit),
        }
    }

    pub fn book_params(&self, symbol: &str) -> Vec<(String, String)> {
        match self {
            Self::Primary => primary::book_params(symbol),
            Self::Alternate => alternate::book_params(symbol),
        }
    }

    // ------------------------------------------------------------------
    // Streaming
    // ------------------------------------------------------------------

    /// Stream name for an instrument/channel pair.
    pub fn stream_name(&self, symbol: &str, channel: Channel) -> String {
        match self {
            Self::Primary => primary::stream_name(symbol, channel),
            Self::Alternate => alternate::stream_name(symbol, channel),
        }
    }

    /// Subscribe (or unsubscribe) control message for a batch of streams.
    pub fn subscription_message(&self, id: u64, streams: &[String], subscribe: bool) -> Value {
        match self {
            Self::Primary => primary::subscription_message(id, streams, subscribe),
            Self::Alternate => alternate::subscription_message(id, streams, subscribe),
        }
    }

    /// Canonicalize an inbound frame into zero or more events.
    pub fn normalize_stream(&self, frame: &Value) -> Vec<StreamEvent> {
        match self {
            Self::Primary => primary::normalize_stream(frame),
            Self::Alternate => alternate::normalize_stream(frame),
        }
    }

    /// Application-level heartbeat that must be answered, if any.
    pub fn heartbeat_reply(&self, frame: &Value) -> Option<Value> {
        match self {
            Self::Primary => primary::heartbeat_reply(frame),
            Self::Alternate => None,
        }
    }
}

impl fmt::Display for ExchangeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------------------------------------------------
// Field helpers shared by the variant modules
// ----------------------------------------------------------------------

/// Decimal from a JSON string or number.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn decimal_field(raw: &Value, key: &str) -> Option<Decimal> {
    raw.get(key).and_then(parse_decimal)
}

/// String from a JSON string or number (ids are sent either way).
fn string_field(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn u32_field(raw: &Value, key: &str) -> Option<u32> {
    match raw.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn i64_field(raw: &Value, key: &str) -> Option<i64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}
