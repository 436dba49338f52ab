//! Core domain types for the cexlink exchange connector.
//!
//! This crate provides the value objects shared by every other crate:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `Contract`: Instrument with tick/lot granularity rules
//! - `Balance`, `Candle`, `OrderStatus`, `Fill`: Normalized REST payloads
//! - `Trade`: Strategy-owned position whose PnL is updated live
//! - `StreamEvent`: Canonical streaming events
//! - `ExchangeVariant`: Per-variant endpoints, field mapping and parsers

pub mod account;
pub mod contract;
pub mod decimal;
pub mod error;
pub mod event;
pub mod order;
pub mod trade;
pub mod variant;

pub use account::{weighted_average_price, Balance, Candle, Fill, OrderStatus, Timeframe};
pub use contract::Contract;
pub use decimal::{decimals_in_step, Price, Size};
pub use error::{CoreError, Result};
pub use event::{Channel, StreamEvent};
pub use order::{OrderRequest, OrderSide, OrderType, TimeInForce};
pub use trade::{Trade, TradeStatus};
pub use variant::{Endpoint, Endpoints, ExchangeVariant, HttpMethod};
