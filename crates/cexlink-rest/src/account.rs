//! Account and market queries: balances, trade sizing, candles, snapshots.

use crate::orders::OrderManager;
use cexlink_core::{Balance, Candle, Contract, Price, Size, Timeframe};
use cexlink_feed::BidAsk;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

impl OrderManager {
    /// Signed balance query, keyed by asset.
    pub async fn get_balances(&self) -> Option<HashMap<String, Balance>> {
        let endpoint = self.variant.endpoints().balances;
        let body = self.gateway.execute_opt(endpoint, Vec::new(), true).await?;
        let balances = self.variant.parse_balances(&body);
        debug!(assets = balances.len(), "Balances fetched");
        Some(balances)
    }

    /// Quantity worth `balance_percent`% of the free quote balance at
    /// `price`, floored to the lot size.
    pub async fn get_trade_size(
        &self,
        contract: &Contract,
        price: Price,
        balance_percent: Decimal,
    ) -> Option<Size> {
        if !price.is_positive() {
            warn!(symbol = contract.symbol(), %price, "Trade size needs a positive price");
            return None;
        }

        let balances = self.get_balances().await?;
        let Some(balance) = balances.get(contract.quote_asset()) else {
            warn!(
                symbol = contract.symbol(),
                asset = contract.quote_asset(),
                "Quote asset not held"
            );
            return None;
        };

        Some(trade_size(contract, balance.free, price, balance_percent))
    }

    /// Public candle history, ascending by timestamp.
    pub async fn get_candles(
        &self,
        contract: &Contract,
        timeframe: Timeframe,
        limit: u32,
    ) -> Option<Vec<Candle>> {
        let endpoint = self.variant.endpoints().candles;
        let params = self.variant.candle_params(contract.symbol(), timeframe, limit);
        let body = self.gateway.execute_opt(endpoint, params, false).await?;
        Some(self.variant.parse_candles(&body, timeframe))
    }

    /// Public top-of-book snapshot. Also written to the price cache.
    pub async fn get_bid_ask(&self, contract: &Contract) -> Option<BidAsk> {
        let endpoint = self.variant.endpoints().book_ticker;
        let params = self.variant.book_params(contract.symbol());
        let body = self.gateway.execute_opt(endpoint, params, false).await?;

        let Some((bid, ask)) = self.variant.parse_book_snapshot(&body, contract.symbol()) else {
            warn!(symbol = contract.symbol(), "Book snapshot missing bid/ask");
            return None;
        };
        self.prices.set_bid_ask(contract.symbol(), bid, ask);
        Some(BidAsk::new(bid, ask))
    }
}

fn trade_size(contract: &Contract, free_quote: Decimal, price: Price, percent: Decimal) -> Size {
    let raw = free_quote * percent / HUNDRED / price.inner();
    contract.floor_quantity(Size::new(raw))
}
