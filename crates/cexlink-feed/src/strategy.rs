//! Strategy consumer interface.
//!
//! Strategy logic lives outside the connector. The connector only pushes
//! public trades into `parse_trade`/`check_trade` and refreshes the PnL of
//! open trades on book updates.

use cexlink_core::{Candle, Contract, Price, Size, Trade};
use parking_lot::Mutex;
use std::sync::Arc;

/// Effect of one public trade on a strategy's candle series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandleUpdate {
    /// Trade was folded into the current candle.
    SameCandle,
    /// Trade opened a new candle; carries the candle that just closed.
    NewCandle(Candle),
    /// Trade was not used (e.g. older than the current candle).
    Ignored,
}

/// Trading strategy fed by the streaming session.
///
/// Callbacks run on the session task, in frame arrival order, while the
/// strategy's mutex is held. They must not block.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Instrument the strategy trades. Events for other symbols are not
    /// delivered.
    fn contract(&self) -> &Contract;

    /// Trades owned by the strategy. Open trades get their PnL refreshed on
    /// every book ticker for `contract()`.
    fn trades_mut(&mut self) -> &mut Vec<Trade>;

    fn parse_trade(&mut self, price: Price, quantity: Size, timestamp_ms: i64) -> CandleUpdate;

    fn check_trade(&mut self, update: CandleUpdate);
}

/// Strategy shared between its owner and the notifier.
pub type SharedStrategy = Arc<Mutex<dyn Strategy>>;
