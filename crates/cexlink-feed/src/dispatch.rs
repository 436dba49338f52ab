//! Canonical event routing.

use crate::notifier::StrategyNotifier;
use crate::price_cache::PriceCache;
use cexlink_core::{Price, Size, StreamEvent};
use std::sync::Arc;
use tracing::trace;

/// Routes stream events to the price cache and registered strategies.
#[derive(Debug, Clone)]
pub struct MarketDispatcher {
    prices: Arc<PriceCache>,
    strategies: Arc<StrategyNotifier>,
}

impl MarketDispatcher {
    pub fn new(prices: Arc<PriceCache>, strategies: Arc<StrategyNotifier>) -> Self {
        Self { prices, strategies }
    }

    pub fn prices(&self) -> &Arc<PriceCache> {
        &self.prices
    }

    pub fn strategies(&self) -> &Arc<StrategyNotifier> {
        &self.strategies
    }

    pub fn dispatch(&self, event: &StreamEvent) {
        match event {
            StreamEvent::BookTicker { symbol, bid, ask } => self.on_book_ticker(symbol, *bid, *ask),
            StreamEvent::AggTrade {
                symbol,
                price,
                quantity,
                timestamp_ms,
            } => self.on_trade(symbol, *price, *quantity, *timestamp_ms),
        }
    }

    /// Cache the quote, then mark every open trade on `symbol` to market.
    fn on_book_ticker(&self, symbol: &str, bid: Price, ask: Price) {
        self.prices.set_bid_ask(symbol, bid, ask);

        for strategy in self.strategies.snapshot() {
            let mut strategy = strategy.lock();
            if strategy.contract().symbol() != symbol {
                continue;
            }
            for trade in strategy.trades_mut().iter_mut().filter(|t| t.is_open()) {
                trade.update_pnl(bid, ask);
                trace!(symbol, entry_id = %trade.entry_id, pnl = %trade.pnl, "Trade marked");
            }
        }
    }

    fn on_trade(&self, symbol: &str, price: Price, quantity: Size, timestamp_ms: i64) {
        for strategy in self.strategies.snapshot() {
            let mut strategy = strategy.lock();
            if strategy.contract().symbol() != symbol {
                continue;
            }
            let update = strategy.parse_trade(price, quantity, timestamp_ms);
            strategy.check_trade(update);
        }
    }
}
