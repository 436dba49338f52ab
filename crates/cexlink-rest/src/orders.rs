//! Order lifecycle: place, cancel, status.
//!
//! Every operation returns `None` on failure after logging it. Filled orders
//! without a reported average price are reconciled from the account's fills.

use crate::gateway::RestGateway;
use cexlink_core::{
    weighted_average_price, Contract, ExchangeVariant, OrderRequest, OrderSide, OrderStatus,
    OrderType, Price, Size, TimeInForce,
};
use cexlink_feed::PriceCache;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Order and account operations against one exchange variant.
pub struct OrderManager {
    pub(crate) gateway: Arc<RestGateway>,
    pub(crate) variant: ExchangeVariant,
    pub(crate) prices: Arc<PriceCache>,
}

impl OrderManager {
    pub fn new(gateway: Arc<RestGateway>, variant: ExchangeVariant, prices: Arc<PriceCache>) -> Self {
        Self {
            gateway,
            variant,
            prices,
        }
    }

    /// Build a request with quantity floored to the lot size and price
    /// rounded to the nearest tick.
    ///
    /// Returns `None` if a priced order type has no price or the quantity
    /// floors to zero.
    pub fn build_request(
        contract: &Contract,
        order_type: OrderType,
        side: OrderSide,
        quantity: Size,
        price: Option<Price>,
        time_in_force: Option<TimeInForce>,
    ) -> Option<OrderRequest> {
        let symbol = contract.symbol();

        let price = match (order_type.requires_price(), price) {
            (true, None) => {
                warn!(symbol, %order_type, "Order rejected: price required");
                return None;
            }
            (true, Some(p)) => Some(contract.format_price(p)),
            (false, _) => None,
        };

        let floored = contract.floor_quantity(quantity);
        if !floored.is_positive() {
            warn!(
                symbol,
                %quantity,
                lot_size = %contract.lot_size(),
                "Order rejected: quantity below lot size"
            );
            return None;
        }

        Some(OrderRequest {
            symbol: symbol.to_string(),
            side,
            order_type,
            quantity: contract.format_quantity(floored),
            price,
            time_in_force,
        })
    }

    pub async fn place_order(
        &self,
        contract: &Contract,
        order_type: OrderType,
        side: OrderSide,
        quantity: Size,
        price: Option<Price>,
        time_in_force: Option<TimeInForce>,
    ) -> Option<OrderStatus> {
        let request =
            Self::build_request(contract, order_type, side, quantity, price, time_in_force)?;

        info!(
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            quantity = %request.quantity,
            price = request.price.as_deref().unwrap_or("-"),
            "Placing order"
        );

        let endpoint = self.variant.endpoints().place_order;
        let body = self
            .gateway
            .execute_opt(endpoint, self.variant.order_params(&request), true)
            .await?;
        let status = self.variant.parse_order_status(&body)?;

        info!(order_id = %status.order_id, status = %status.status, "Order accepted");
        Some(self.reconcile(contract, status).await)
    }

    pub async fn cancel_order(&self, contract: &Contract, order_id: &str) -> Option<OrderStatus> {
        let endpoint = self.variant.endpoints().cancel_order;
        let body = self
            .gateway
            .execute_opt(endpoint, self.variant.order_id_params(contract.symbol(), order_id), true)
            .await?;
        let status = self.variant.parse_order_status(&body)?;

        info!(symbol = contract.symbol(), order_id, status = %status.status, "Order cancelled");
        Some(self.reconcile(contract, status).await)
    }

    pub async fn get_order_status(&self, contract: &Contract, order_id: &str) -> Option<OrderStatus> {
        let endpoint = self.variant.endpoints().order_status;
        let body = self
            .gateway
            .execute_opt(endpoint, self.variant.order_id_params(contract.symbol(), order_id), true)
            .await?;
        let status = self.variant.parse_order_status(&body)?;
        Some(self.reconcile(contract, status).await)
    }

    /// Fill in the average price of a filled order from its executions.
    async fn reconcile(&self, contract: &Contract, mut status: OrderStatus) -> OrderStatus {
        if !status.needs_avg_price() {
            return status;
        }

        match self.fetch_fills(contract, &status.order_id).await {
            Some(avg) => status.avg_price = Some(avg),
            None => warn!(
                order_id = %status.order_id,
                "Filled order has no average price and no fills"
            ),
        }
        status
    }

    async fn fetch_fills(&self, contract: &Contract, order_id: &str) -> Option<Price> {
        let endpoint = self.variant.endpoints().fills;
        let body: Value = self
            .gateway
            .execute_opt(endpoint, self.variant.fills_params(contract.symbol(), order_id), true)
            .await?;
        let fills = self.variant.parse_fills(&body, order_id);
        weighted_average_price(&fills).map(|avg| contract.round_price(avg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract() -> Contract {
        Contract::new(
            "BTCUSDT",
            "BTC",
            "USDT",
            Price::new(dec!(0.01)),
            Size::new(dec!(0.001)),
            ExchangeVariant::Alternate,
        )
        .unwrap()
    }

    #[test]
    fn test_build_request_rounds_and_formats() {
        let request = OrderManager::build_request(
            &contract(),
            OrderType::Limit,
            OrderSide::Buy,
            Size::new(dec!(0.0016)),
            Some(Price::new(dec!(101.2345))),
            None,
        )
        .unwrap();

        assert_eq!(request.price.as_deref(), Some("101.23"));
        assert_eq!(request.quantity, "0.001");
    }

    #[test]
    fn test_build_request_rejects_missing_price() {
        for order_type in [OrderType::Limit, OrderType::Stop, OrderType::TakeProfit] {
            let request = OrderManager::build_request(
                &contract(),
                order_type,
                OrderSide::Sell,
                Size::new(dec!(1)),
                None,
                None,
            );
            assert!(request.is_none(), "{order_type}");
        }
    }

    #[test]
    fn test_build_request_market_drops_price() {
        let request = OrderManager::build_request(
            &contract(),
            OrderType::Market,
            OrderSide::Sell,
            Size::new(dec!(1)),
            Some(Price::new(dec!(5))),
            None,
        )
        .unwrap();
        assert!(request.price.is_none());
    }

    #[test]
    fn test_build_request_rejects_dust_quantity() {
        let request = OrderManager::build_request(
            &contract(),
            OrderType::Market,
            OrderSide::Buy,
            Size::new(dec!(0.0009)),
            None,
            None,
        );
        assert!(request.is_none());
    }
}
