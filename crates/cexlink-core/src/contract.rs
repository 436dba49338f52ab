//! Tradable instrument definition.
//!
//! A `Contract` carries the granularity rules of an instrument. Every price
//! and quantity sent to the exchange for this instrument must be an exact
//! multiple of its tick size and lot size respectively.

use crate::decimal::decimals_in_step;
use crate::error::{CoreError, Result};
use crate::variant::ExchangeVariant;
use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Tradable instrument with price/quantity granularity rules.
///
/// Immutable once constructed; the catalog rebuilds contracts on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    tick_size: Price,
    lot_size: Size,
    price_decimals: u32,
    quantity_decimals: u32,
    variant: ExchangeVariant,
}

impl Contract {
    /// Create a contract, deriving decimal precision from tick and lot size.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidContract` if tick size or lot size is not
    /// strictly positive, or if the symbol is empty.
    pub fn new(
        symbol: impl Into<String>,
        base_asset: impl Into<String>,
        quote_asset: impl Into<String>,
        tick_size: Price,
        lot_size: Size,
        variant: ExchangeVariant,
    ) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(CoreError::InvalidContract {
                symbol,
                reason: "empty symbol".to_string(),
            });
        }
        if !tick_size.is_positive() {
            return Err(CoreError::InvalidContract {
                symbol,
                reason: format!("tick size must be positive, got {tick_size}"),
            });
        }
        if !lot_size.is_positive() {
            return Err(CoreError::InvalidContract {
                symbol,
                reason: format!("lot size must be positive, got {lot_size}"),
            });
        }

        Ok(Self {
            symbol,
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
            price_decimals: decimals_in_step(tick_size.inner()),
            quantity_decimals: decimals_in_step(lot_size.inner()),
            tick_size,
            lot_size,
            variant,
        })
    }

    /// Override the derived precision with values reported by the exchange.
    ///
    /// Reported precision is clamped to at least the precision of the step.
    pub fn with_decimals(mut self, price_decimals: Option<u32>, quantity_decimals: Option<u32>) -> Self {
        if let Some(dp) = price_decimals {
            let min = decimals_in_step(self.tick_size.inner());
            if dp < min {
                warn!(
                    symbol = %self.symbol,
                    reported = dp,
                    tick_size = %self.tick_size,
                    "Reported price decimals coarser than tick size, using {min}"
                );
            }
            self.price_decimals = dp.max(min);
        }
        if let Some(dp) = quantity_decimals {
            let min = decimals_in_step(self.lot_size.inner());
            if dp < min {
                warn!(
                    symbol = %self.symbol,
                    reported = dp,
                    lot_size = %self.lot_size,
                    "Reported quantity decimals coarser than lot size, using {min}"
                );
            }
            self.quantity_decimals = dp.max(min);
        }
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn base_asset(&self) -> &str {
        &self.base_asset
    }

    pub fn quote_asset(&self) -> &str {
        &self.quote_asset
    }

    pub fn tick_size(&self) -> Price {
        self.tick_size
    }

    pub fn lot_size(&self) -> Size {
        self.lot_size
    }

    pub fn price_decimals(&self) -> u32 {
        self.price_decimals
    }

    pub fn quantity_decimals(&self) -> u32 {
        self.quantity_decimals
    }

    pub fn variant(&self) -> ExchangeVariant {
        self.variant
    }

    /// Round a price to the nearest tick.
    pub fn round_price(&self, price: Price) -> Price {
        price.round_to_tick(self.tick_size)
    }

    /// Floor a quantity to the lot size.
    pub fn floor_quantity(&self, quantity: Size) -> Size {
        quantity.round_to_lot(self.lot_size)
    }

    /// Round to the nearest tick and format to `price_decimals` places.
    pub fn format_price(&self, price: Price) -> String {
        self.round_price(price)
            .format_with_decimals(self.price_decimals)
    }

    /// Floor to the lot size and format to `quantity_decimals` places.
    pub fn format_quantity(&self, quantity: Size) -> String {
        self.floor_quantity(quantity)
            .format_with_decimals(self.quantity_decimals)
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
