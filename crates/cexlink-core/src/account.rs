//! Normalized account, market history and order payloads.

use crate::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-asset balance snapshot.
///
/// Recreated wholesale on each balance query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Asset code (e.g., "USDT").
    pub asset: String,
    /// Amount available for new orders.
    pub free: Decimal,
    /// Wallet/total amount including locked funds.
    pub total: Decimal,
    /// Unrealized PnL (zero for spot wallets).
    pub unrealized_pnl: Decimal,
    pub initial_margin: Option<Decimal>,
    pub maintenance_margin: Option<Decimal>,
    pub margin_balance: Option<Decimal>,
}

impl Balance {
    /// Spot-style balance without margin figures.
    pub fn spot(asset: impl Into<String>, free: Decimal, total: Decimal) -> Self {
        Self {
            asset: asset.into(),
            free,
            total,
            unrealized_pnl: Decimal::ZERO,
            initial_margin: None,
            maintenance_margin: None,
            margin_balance: None,
        }
    }
}

/// Candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Canonical short name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Interval length in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            Self::M1 => MINUTE,
            Self::M5 => 5 * MINUTE,
            Self::M15 => 15 * MINUTE,
            Self::M30 => 30 * MINUTE,
            Self::H1 => 60 * MINUTE,
            Self::H4 => 240 * MINUTE,
            Self::D1 => 1440 * MINUTE,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in epoch milliseconds.
    pub timestamp: i64,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Size,
    pub timeframe: Timeframe,
}

/// Result of a place/cancel/status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: String,
    /// Lowercase exchange status ("new", "filled", "canceled", ...).
    pub status: String,
    /// Average executed price. `None` until reported or reconciled.
    pub avg_price: Option<Price>,
    pub executed_qty: Size,
}

impl OrderStatus {
    pub fn is_filled(&self) -> bool {
        self.status == "filled"
    }

    /// Filled order whose average price still has to be derived from fills.
    pub fn needs_avg_price(&self) -> bool {
        self.is_filled() && self.avg_price.map_or(true, |p| p.is_zero())
    }
}

/// Single execution belonging to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub price: Price,
    pub quantity: Size,
}

/// Quantity-weighted mean price: Σ(pᵢ·qᵢ) / Σqᵢ.
///
/// Returns `None` when the fills carry no quantity.
pub fn weighted_average_price(fills: &[Fill]) -> Option<Price> {
    let (notional, quantity) = fills
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(notional, qty), fill| {
            (notional + fill.quantity.notional(fill.price), qty + fill.quantity.inner())
        });

    if quantity.is_zero() {
        return None;
    }
    Some(Price::new(notional / quantity))
}
