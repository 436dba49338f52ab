//! Strategy-owned trade record.
//!
//! Strategies create and close trades. The connector only refreshes the
//! `pnl` of open trades on every book ticker update.

use crate::{OrderSide, Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Open or closed position taken by a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Entry time in epoch milliseconds.
    pub time: i64,
    pub symbol: String,
    pub strategy: String,
    pub side: OrderSide,
    pub entry_price: Price,
    pub status: TradeStatus,
    pub pnl: Decimal,
    pub quantity: Size,
    pub entry_id: String,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Recompute PnL from the current top of book.
    ///
    /// Longs are marked against the bid and shorts against the ask, so the
    /// figure already includes the cost of crossing the spread to exit.
    pub fn update_pnl(&mut self, bid: Price, ask: Price) {
        self.pnl = match self.side {
            OrderSide::Buy => (bid - self.entry_price).inner() * self.quantity.inner(),
            OrderSide::Sell => (self.entry_price - ask).inner() * self.quantity.inner(),
        };
    }
}
