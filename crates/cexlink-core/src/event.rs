//! Canonical streaming events.
//!
//! Exchange variants use different field layouts for equivalent events;
//! every inbound frame is normalized into a `StreamEvent` before dispatch.

use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Streaming channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "bookTicker")]
    BookTicker,
    #[serde(rename = "aggTrade")]
    AggTrade,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookTicker => "bookTicker",
            Self::AggTrade => "aggTrade",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized streaming event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum StreamEvent {
    /// Best bid/ask update.
    #[serde(rename = "bookTicker")]
    BookTicker {
        symbol: String,
        bid: Price,
        ask: Price,
    },
    /// Public trade print.
    #[serde(rename = "aggTrade")]
    AggTrade {
        symbol: String,
        price: Price,
        quantity: Size,
        timestamp_ms: i64,
    },
}

impl StreamEvent {
    pub fn symbol(&self) -> &str {
        match self {
            Self::BookTicker { symbol, .. } | Self::AggTrade { symbol, .. } => symbol,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Self::BookTicker { .. } => Channel::BookTicker,
            Self::AggTrade { .. } => Channel::AggTrade,
        }
    }
}
