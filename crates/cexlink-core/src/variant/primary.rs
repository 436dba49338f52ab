//! Crypto.com-style payload layout.
//!
//! Responses are wrapped as `{"id", "method", "code", "result": {...}}`,
//! with lists under `result.data`.

use super::{decimal_field, i64_field, param, string_field, u32_field, Endpoint, Endpoints, HttpMethod};
use crate::{
    Balance, Candle, Channel, Contract, ExchangeVariant, Fill, OrderRequest, OrderStatus,
    OrderType, Price, Size, StreamEvent, TimeInForce, Timeframe,
};
use serde_json::{json, Value};
use std::collections::HashMap;

const REST_URL: &str = "https://api.crypto.com/exchange/v1";
const REST_URL_TESTNET: &str = "https://uat-api.3ona.co/exchange/v1";
const STREAM_URL: &str = "wss://stream.crypto.com/exchange/v1/market";
const STREAM_URL_TESTNET: &str = "wss://uat-stream.3ona.co/exchange/v1/market";

pub(super) static ENDPOINTS: Endpoints = Endpoints {
    instruments: Endpoint { method: HttpMethod::Get, path: "/public/get-instruments" },
    book_ticker: Endpoint { method: HttpMethod::Get, path: "/public/get-tickers" },
    candles: Endpoint { method: HttpMethod::Get, path: "/public/get-candlestick" },
    balances: Endpoint { method: HttpMethod::Post, path: "/private/user-balance" },
    place_order: Endpoint { method: HttpMethod::Post, path: "/private/create-order" },
    cancel_order: Endpoint { method: HttpMethod::Post, path: "/private/cancel-order" },
    order_status: Endpoint { method: HttpMethod::Post, path: "/private/get-order-detail" },
    fills: Endpoint { method: HttpMethod::Post, path: "/private/get-trades" },
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

/// `result`, or the body itself when unwrapped.
fn result(body: &Value) -> &Value {
    body.get("result").unwrap_or(body)
}

/// List under `result.data`, or `result` itself when it is an array.
fn data_list(body: &Value) -> &[Value] {
    let result = result(body);
    result
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| result.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// ----------------------------------------------------------------------
// Entities
// ----------------------------------------------------------------------

pub(super) fn contract_records(body: &Value) -> Vec<&Value> {
    data_list(body).iter().collect()
}

pub(super) fn parse_contract(raw: &Value) -> Option<Contract> {
    let symbol = string_field(raw, "instrument_name").or_else(|| string_field(raw, "symbol"))?;
    let base = string_field(raw, "base_ccy").or_else(|| string_field(raw, "base_currency"))?;
    let quote = string_field(raw, "quote_ccy").or_else(|| string_field(raw, "quote_currency"))?;
    let tick = decimal_field(raw, "price_tick_size")?;
    let lot = decimal_field(raw, "qty_tick_size")?;

    let contract = Contract::new(
        symbol,
        base,
        quote,
        Price::new(tick),
        Size::new(lot),
        ExchangeVariant::Primary,
    )
    .ok()?;

    Some(contract.with_decimals(
        u32_field(raw, "quote_decimals"),
        u32_field(raw, "quantity_decimals"),
    ))
}

pub(super) fn parse_balances(body: &Value) -> HashMap<String, Balance> {
    let mut balances = HashMap::new();

    for account in data_list(body) {
        if let Some(positions) = account.get("position_balances").and_then(Value::as_array) {
            for position in positions {
                let Some(asset) = string_field(position, "instrument_name") else {
                    continue;
                };
                let Some(quantity) = decimal_field(position, "quantity") else {
                    continue;
                };
                let free = decimal_field(position, "max_withdrawal_balance").unwrap_or(quantity);
                balances.insert(asset.clone(), Balance::spot(asset, free, quantity));
            }
        }

        // Account-level margin summary, denominated in the settlement asset.
        let Some(asset) = string_field(account, "instrument_name") else {
            continue;
        };
        let Some(free) = decimal_field(account, "total_available_balance") else {
            continue;
        };
        let margin_balance = decimal_field(account, "total_margin_balance");
        let total = decimal_field(account, "total_cash_balance")
            .or(margin_balance)
            .unwrap_or(free);

        balances.insert(
            asset.clone(),
            Balance {
                asset,
                free,
                total,
                unrealized_pnl: decimal_field(account, "total_session_unrealized_pnl")
                    .unwrap_or_default(),
                initial_margin: decimal_field(account, "total_initial_margin"),
                maintenance_margin: decimal_field(account, "total_maintenance_margin"),
                margin_balance,
            },
        );
    }

    balances
}

pub(super) fn parse_order_status(body: &Value) -> Option<OrderStatus> {
    let result = result(body);
    let order_id = string_field(result, "order_id")?;
    let status = match string_field(result, "status") {
        Some(s) if s.eq_ignore_ascii_case("active") => "open".to_string(),
        Some(s) => s.to_lowercase(),
        None => "new".to_string(),
    };

    Some(OrderStatus {
        order_id,
        status,
        avg_price: decimal_field(result, "avg_price").map(Price::new),
        executed_qty: decimal_field(result, "cumulative_quantity")
            .map(Size::new)
            .unwrap_or(Size::ZERO),
    })
}

pub(super) fn parse_fills(body: &Value) -> Vec<Fill> {
    data_list(body)
        .iter()
        .filter_map(|raw| {
            Some(Fill {
                order_id: string_field(raw, "order_id")?,
                price: Price::new(decimal_field(raw, "traded_price")?),
                quantity: Size::new(decimal_field(raw, "traded_quantity")?),
            })
        })
        .collect()
}

pub(super) fn parse_candles(body: &Value, timeframe: Timeframe) -> Vec<Candle> {
    data_list(body)
        .iter()
        .filter_map(|raw| {
            Some(Candle {
                timestamp: i64_field(raw, "t")?,
                open: Price::new(decimal_field(raw, "o")?),
                high: Price::new(decimal_field(raw, "h")?),
                low: Price::new(decimal_field(raw, "l")?),
                close: Price::new(decimal_field(raw, "c")?),
                volume: Size::new(decimal_field(raw, "v")?),
                timeframe,
            })
        })
        .collect()
}

pub(super) fn parse_book_snapshot(body: &Value, symbol: &str) -> Option<(Price, Price)> {
    let tickers = data_list(body);
    // An unlabelled ticker is only trusted when it is the sole entry.
    let ticker = match tickers
        .iter()
        .find(|t| string_field(t, "i").as_deref() == Some(symbol))
    {
        Some(ticker) => ticker,
        None => match tickers {
            [only] if only.get("i").is_none() => only,
            _ => return None,
        },
    };

    Some((
        Price::new(decimal_field(ticker, "b")?),
        Price::new(decimal_field(ticker, "k")?),
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

fn time_in_force_name(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Gtc => "GOOD_TILL_CANCEL",
        TimeInForce::Ioc => "IMMEDIATE_OR_CANCEL",
        TimeInForce::Fok => "FILL_OR_KILL",
    }
}

pub(super) fn order_params(request: &OrderRequest) -> Vec<(String, String)> {
    let mut params = vec![
        param("instrument_name", request.symbol.as_str()),
        param("side", request.side.as_str()),
        param("type", order_type_name(request.order_type)),
        param("quantity", request.quantity.as_str()),
    ];

    if let Some(price) = &request.price {
        match request.order_type {
            OrderType::Limit => params.push(param("price", price.as_str())),
            OrderType::Stop | OrderType::TakeProfit => {
                params.push(param("ref_price", price.as_str()))
            }
            OrderType::Market => {}
        }
    }

    if request.order_type == OrderType::Limit {
        let tif = request.time_in_force.unwrap_or_default();
        params.push(param("time_in_force", time_in_force_name(tif)));
    }

    params
}

pub(super) fn order_id_params(symbol: &str, order_id: &str) -> Vec<(String, String)> {
    vec![param("instrument_name", symbol), param("order_id", order_id)]
}

pub(super) fn fills_params(symbol: &str, _order_id: &str) -> Vec<(String, String)> {
    vec![param("instrument_name", symbol)]
}

fn timeframe_name(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::M1 => "1m",
        Timeframe::M5 => "5m",
        Timeframe::M15 => "15m",
        Timeframe::M30 => "30m",
        Timeframe::H1 => "1h",
        Timeframe::H4 => "4h",
        Timeframe::D1 => "1D",
    }
}

pub(super) fn candle_params(symbol: &str, timeframe: Timeframe, limit: u32) -> Vec<(String, String)> {
    vec![
        param("instrument_name", symbol),
        param("timeframe", timeframe_name(timeframe)),
        param("count", limit.to_string()),
    ]
}

pub(super) fn book_params(symbol: &str) -> Vec<(String, String)> {
    vec![param("instrument_name", symbol)]
}

// ----------------------------------------------------------------------
// Streaming
// ----------------------------------------------------------------------

pub(super) fn stream_name(symbol: &str, channel: Channel) -> String {
    let prefix = match channel {
        Channel::BookTicker => "ticker",
        Channel::AggTrade => "trade",
    };
    format!("{prefix}.{symbol}")
}

pub(super) fn subscription_message(id: u64, streams: &[String], subscribe: bool) -> Value {
    json!({
        "id": id,
        "method": if subscribe { "subscribe" } else { "unsubscribe" },
        "params": { "channels": streams },
    })
}

pub(super) fn normalize_stream(frame: &Value) -> Vec<StreamEvent> {
    let Some(result) = frame.get("result") else {
        return Vec::new();
    };
    let Some(channel) = result.get("channel").and_then(Value::as_str) else {
        return Vec::new();
    };
    let instrument = string_field(result, "instrument_name");
    let Some(items) = result.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    let symbol_of = |item: &Value| string_field(item, "i").or_else(|| instrument.clone());

    match channel {
        "ticker" => items
            .iter()
            .filter_map(|item| {
                Some(StreamEvent::BookTicker {
                    symbol: symbol_of(item)?,
                    bid: Price::new(decimal_field(item, "b")?),
                    ask: Price::new(decimal_field(item, "k")?),
                })
            })
            .collect(),
        "trade" => items
            .iter()
            .filter_map(|item| {
                Some(StreamEvent::AggTrade {
                    symbol: symbol_of(item)?,
                    price: Price::new(decimal_field(item, "p")?),
                    quantity: Size::new(decimal_field(item, "q")?),
                    timestamp_ms: i64_field(item, "t")?,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub(super) fn heartbeat_reply(frame: &Value) -> Option<Value> {
    if frame.get("method").and_then(Value::as_str) != Some("public/heartbeat") {
        return None;
    }
    Some(json!({
        "id": frame.get("id").cloned().unwrap_or(Value::Null),
        "method": "public/respond-heartbeat",
    }))
}
