//! Latest top-of-book per symbol.

use cexlink_core::Price;
use dashmap::DashMap;
use rust_decimal::Decimal;

/// Best bid/ask. Each side is `None` until its first update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BidAsk {
    pub bid: Option<Price>,
    pub ask: Option<Price>,
}

impl BidAsk {
    pub fn new(bid: Price, ask: Price) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
        }
    }

    /// Both sides known.
    pub fn is_complete(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }

    /// Mid price, if both sides are known.
    pub fn mid(&self) -> Option<Price> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }
}

/// Concurrent symbol → bid/ask map. Last write wins.
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: DashMap<String, BidAsk>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<BidAsk> {
        self.entries.get(symbol).map(|entry| *entry)
    }

    /// Replace the entry for `symbol`.
    pub fn set(&self, symbol: impl Into<String>, value: BidAsk) {
        self.entries.insert(symbol.into(), value);
    }

    /// Store both sides from a book update.
    pub fn set_bid_ask(&self, symbol: impl Into<String>, bid: Price, ask: Price) {
        self.set(symbol, BidAsk::new(bid, ask));
    }

    /// Existing entry, or an empty one inserted atomically.
    pub fn get_or_initialize(&self, symbol: &str) -> BidAsk {
        *self.entries.entry(symbol.to_string()).or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
