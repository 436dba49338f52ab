//! Binance-style payload layout.

use super::{decimal_field, i64_field, param, parse_decimal, string_field, Endpoint, Endpoints, HttpMethod};
use crate::{
    Balance, Candle, Channel, Contract, ExchangeVariant, Fill, OrderRequest, OrderStatus,
    OrderType, Price, Size, StreamEvent, Timeframe,
};
use serde_json::{json, Value};
use std::collections::HashMap;

const REST_URL: &str = "https://api.binance.com";
const REST_URL_TESTNET: &str = "https://testnet.binance.vision";
const STREAM_URL: &str = "wss://stream.binance.com:9443/ws";
const STREAM_URL_TESTNET: &str = "wss://testnet.binance.vision/ws";

pub(super) static ENDPOINTS: Endpoints = Endpoints {
    instruments: Endpoint { method: HttpMethod::Get, path: "/api/v3/exchangeInfo" },
    book_ticker: Endpoint { method: HttpMethod::Get, path: "/api/v3/ticker/bookTicker" },
    candles: Endpoint { method: HttpMethod::Get, path: "/api/v3/klines" },
    balances: Endpoint { method: HttpMethod::Get, path: "/api/v3/account" },
    place_order: Endpoint { method: HttpMethod::Post, path: "/api/v3/order" },
    cancel_order: Endpoint { method: HttpMethod::Delete, path: "/api/v3/order" },
    order_status: Endpoint { method: HttpMethod::Get, path: "/api/v3/order" },
    fills: Endpoint { method: HttpMethod::Get, path: "/api/v3/myTrades" },
};

pub(super) fn rest_base_url(testnet: bool) -> &'static str {
    if testnet {
        REST_URL_TESTNET
    } else {
        REST_URL
    }
}

pub(super) fn stream_url(testnet: bool) -> &'static str {
    if testnet {
        STREAM_URL_TESTNET
    } else {
        STREAM_URL
    }
}

fn as_list(body: &Value) -> &[Value] {
    body.as_array().map(Vec::as_slice).unwrap_or(&[])
}

// ----------------------------------------------------------------------
// Entities
// ----------------------------------------------------------------------

/// Symbols currently trading. Halted or delisted symbols are left out.
pub(super) fn contract_records(body: &Value) -> Vec<&Value> {
    body.get("symbols")
        .map(as_list)
        .unwrap_or(&[])
        .iter()
        .filter(|raw| {
            raw.get("status")
                .and_then(Value::as_str)
                .map_or(true, |status| status == "TRADING")
        })
        .collect()
}

fn filter_value(raw: &Value, filter_type: &str, key: &str) -> Option<rust_decimal::Decimal> {
    raw.get("filters")?
        .as_array()?
        .iter()
        .find(|f| f.get("filterType").and_then(Value::as_str) == Some(filter_type))
        .and_then(|f| decimal_field(f, key))
}

pub(super) fn parse_contract(raw: &Value) -> Option<Contract> {
    let tick = filter_value(raw, "PRICE_FILTER", "tickSize")?;
    let lot = filter_value(raw, "LOT_SIZE", "stepSize")?;

    Contract::new(
        string_field(raw, "symbol")?,
        string_field(raw, "baseAsset")?,
        string_field(raw, "quoteAsset")?,
        Price::new(tick),
        Size::new(lot),
        ExchangeVariant::Alternate,
    )
    .ok()
}

pub(super) fn parse_balances(body: &Value) -> HashMap<String, Balance> {
    body.get("balances")
        .map(as_list)
        .unwrap_or(&[])
        .iter()
        .filter_map(|raw| {
            let asset = string_field(raw, "asset")?;
            let free = decimal_field(raw, "free")?;
            let locked = decimal_field(raw, "locked").unwrap_or_default();
            Some((asset.clone(), Balance::spot(asset, free, free + locked)))
        })
        .collect()
}

pub(super) fn parse_order_status(body: &Value) -> Option<OrderStatus> {
    let order_id = string_field(body, "orderId")?;
    let status = string_field(body, "status")
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "new".to_string());

    Some(OrderStatus {
        order_id,
        status,
        avg_price: decimal_field(body, "avgPrice").map(Price::new),
        executed_qty: decimal_field(body, "executedQty")
            .map(Size::new)
            .unwrap_or(Size::ZERO),
    })
}

pub(super) fn parse_fills(body: &Value) -> Vec<Fill> {
    as_list(body)
        .iter()
        .filter_map(|raw| {
            Some(Fill {
                order_id: string_field(raw, "orderId")?,
                price: Price::new(decimal_field(raw, "price")?),
                quantity: Size::new(decimal_field(raw, "qty")?),
            })
        })
        .collect()
}

/// Klines are positional arrays: `[open_time, open, high, low, close, volume, ...]`.
pub(super) fn parse_candles(body: &Value, timeframe: Timeframe) -> Vec<Candle> {
    as_list(body)
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            let at = |i: usize| row.get(i).and_then(parse_decimal);
            Some(Candle {
                timestamp: row.first()?.as_i64()?,
                open: Price::new(at(1)?),
                high: Price::new(at(2)?),
                low: Price::new(at(3)?),
                close: Price::new(at(4)?),
                volume: Size::new(at(5)?),
                timeframe,
            })
        })
        .collect()
}

pub(super) fn parse_book_snapshot(body: &Value, symbol: &str) -> Option<(Price, Price)> {
    let ticker = match body.as_array() {
        Some(list) => list
            .iter()
            .find(|t| string_field(t, "symbol").as_deref() == Some(symbol))?,
        None => match string_field(body, "symbol") {
            Some(other) if other != symbol => return None,
            _ => body,
        },
    };
    Some((
        Price::new(decimal_field(ticker, "bidPrice")?),
        Price::new(decimal_field(ticker, "askPrice")?),
    ))
}

// ----------------------------------------------------------------------
// Request parameters
// ----------------------------------------------------------------------

fn order_type_name(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Limit => "LIMIT",
        OrderType::Market => "MARKET",
        OrderType::Stop => "STOP_LOSS",
        OrderType::TakeProfit => "TAKE_PROFIT",
    }
}

pub(super) fn order_params(request: &OrderRequest) -> Vec<(String, String)> {
    let mut params = vec![
        param("symbol", request.symbol.as_str()),
        param("side", request.side.as_str()),
        param("type", order_type_name(request.order_type)),
        param("quantity", request.quantity.as_str()),
    ];

    if let Some(price) = &request.price {
        match request.order_type {
            OrderType::Limit => params.push(param("price", price.as_str())),
            OrderType::Stop | OrderType::TakeProfit => {
                params.push(param("stopPrice", price.as_str()))
            }
            OrderType::Market => {}
        }
    }

    if request.order_type == OrderType::Limit {
        let tif = request.time_in_force.unwrap_or_default();
        params.push(param("timeInForce", tif.as_str()));
    }

    params
}

pub(super) fn order_id_params(symbol: &str, order_id: &str) -> Vec<(String, String)> {
    vec![param("symbol", symbol), param("orderId", order_id)]
}

pub(super) fn fills_params(symbol: &str, order_id: &str) -> Vec<(String, String)> {
    vec![param("symbol", symbol), param("orderId", order_id)]
}

pub(super) fn candle_params(symbol: &str, timeframe: Timeframe, limit: u32) -> Vec<(String, String)> {
    vec![
        param("symbol", symbol),
        param("interval", timeframe.as_str()),
        param("limit", limit.to_string()),
    ]
}

pub(super) fn book_params(symbol: &str) -> Vec<(String, String)> {
    vec![param("symbol", symbol)]
}

// ----------------------------------------------------------------------
// Streaming
// ----------------------------------------------------------------------

pub(super) fn stream_name(symbol: &str, channel: Channel) -> String {
    format!("{}@{}", symbol.to_lowercase(), channel.as_str())
}

pub(super) fn subscription_message(id: u64, streams: &[String], subscribe: bool) -> Value {
    json!({
        "method": if subscribe { "SUBSCRIBE" } else { "UNSUBSCRIBE" },
        "params": streams,
        "id": id,
    })
}

pub(super) fn normalize_stream(frame: &Value) -> Vec<StreamEvent> {
    // Combined-stream envelope: {"stream": "...", "data": {...}}
    let payload = match (frame.get("stream"), frame.get("data")) {
        (Some(_), Some(data)) => data,
        _ => frame,
    };

    let event = match payload.get("e").and_then(Value::as_str) {
        Some("aggTrade") | Some("trade") => trade_event(payload),
        Some("bookTicker") => book_ticker_event(payload),
        Some(_) => None,
        // Legacy book ticker frames carry no event type.
        None if payload.get("u").is_some() => book_ticker_event(payload),
        None => None,
    };

    event.into_iter().collect()
}

fn book_ticker_event(payload: &Value) -> Option<StreamEvent> {
    Some(StreamEvent::BookTicker {
        symbol: string_field(payload, "s")?,
        bid: Price::new(decimal_field(payload, "b")?),
        ask: Price::new(decimal_field(payload, "a")?),
    })
}

fn trade_event(payload: &Value) -> Option<StreamEvent> {
    Some(StreamEvent::AggTrade {
        symbol: string_field(payload, "s")?,
        price: Price::new(decimal_field(payload, "p")?),
        quantity: Size::new(decimal_field(payload, "q")?),
        timestamp_ms: i64_field(payload, "T").or_else(|| i64_field(payload, "t"))?,
    })
}
