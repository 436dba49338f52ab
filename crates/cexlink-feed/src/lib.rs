//! Live market state for cexlink.
//!
//! - `PriceCache`: latest bid/ask per symbol, written by the stream and
//!   by REST snapshots
//! - `StrategyNotifier`: registry of strategies that consume live updates
//! - `MarketDispatcher`: routes canonical stream events to both

pub mod dispatch;
pub mod notifier;
pub mod price_cache;
pub mod strategy;

pub use dispatch::MarketDispatcher;
pub use notifier::{StrategyHandle, StrategyNotifier};
pub use price_cache::{BidAsk, PriceCache};
pub use strategy::{CandleUpdate, SharedStrategy, Strategy};
