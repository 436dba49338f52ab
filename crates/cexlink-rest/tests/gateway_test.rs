//! REST gateway, catalog and order lifecycle against a local mock exchange.

use axum::extract::RawQuery;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use cexlink_core::{ExchangeVariant, HttpMethod, OrderSide, OrderType, Price, Size, Timeframe};
use cexlink_feed::PriceCache;
use cexlink_rest::gateway::API_KEY_HEADER;
use cexlink_rest::{ContractCatalog, OrderManager, RestError, RestGateway, SignatureEngine};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const API_KEY: &str = "test-key";
const SECRET: &str = "test-secret";

type Reply = (StatusCode, Json<Value>);

/// Accept only requests carrying the key header and a valid trailing signature.
fn verify(headers: &HeaderMap, query: Option<String>) -> Result<(), Reply> {
    let unauthorized = |msg: &str| (StatusCode::UNAUTHORIZED, Json(json!({"code": -2015, "msg": msg})));

    if headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return Err(unauthorized("missing api key"));
    }
    let query = query.ok_or_else(|| unauthorized("missing query"))?;
    let (unsigned, signature) = query
        .rsplit_once("&signature=")
        .ok_or_else(|| unauthorized("missing signature"))?;
    if !unsigned.contains("timestamp=") {
        return Err(unauthorized("missing timestamp"));
    }
    let expected = SignatureEngine::new(SECRET).unwrap().sign(unsigned).unwrap();
    if expected != signature {
        return Err(unauthorized("bad signature"));
    }
    Ok(())
}

fn signed(headers: HeaderMap, query: Option<String>, body: Value) -> Reply {
    match verify(&headers, query) {
        Ok(()) => (StatusCode::OK, Json(body)),
        Err(reply) => reply,
    }
}

fn mock_exchange() -> Router {
    Router::new()
        .route(
            "/api/v3/exchangeInfo",
            get(|| async {
                Json(json!({"symbols": [
                    {
                        "symbol": "ETHUSDT", "status": "TRADING",
                        "baseAsset": "ETH", "quoteAsset": "USDT",
                        "filters": [
                            {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                            {"filterType": "LOT_SIZE", "stepSize": "0.0001"}
                        ]
                    },
                    {
                        "symbol": "BTCUSDT", "status": "TRADING",
                        "baseAsset": "BTC", "quoteAsset": "USDT",
                        "filters": [
                            {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                            {"filterType": "LOT_SIZE", "stepSize": "0.001"}
                        ]
                    },
                    {"symbol": "BROKEN", "baseAsset": "X", "quoteAsset": "USDT", "filters": []}
                ]}))
            }),
        )
        .route(
            "/api/v3/account",
            get(|headers: HeaderMap, RawQuery(q): RawQuery| async move {
                signed(headers, q, json!({"balances": [
                    {"asset": "USDT", "free": "1000", "locked": "0"},
                    {"asset": "BTC", "free": "0.5", "locked": "0.1"}
                ]}))
            }),
        )
        .route(
            "/api/v3/order",
            get(|headers: HeaderMap, RawQuery(q): RawQuery| async move {
                // Order 42 reports FILLED without a price; anything else is still open
                let filled = q.as_deref().is_some_and(|q| q.contains("orderId=42&"));
                let body = if filled {
                    json!({"orderId": 42, "status": "FILLED", "executedQty": "5"})
                } else {
                    json!({"orderId": 7, "status": "NEW", "executedQty": "0"})
                };
                signed(headers, q, body)
            })
            .post(|headers: HeaderMap, RawQuery(q): RawQuery| async move {
                signed(headers, q, json!({"orderId": 42, "status": "FILLED", "executedQty": "5"}))
            })
            .delete(|headers: HeaderMap, RawQuery(q): RawQuery| async move {
                signed(headers, q, json!({"orderId": 7, "status": "CANCELED", "executedQty": "0"}))
            }),
        )
        .route(
            "/api/v3/myTrades",
            get(|headers: HeaderMap, RawQuery(q): RawQuery| async move {
                signed(headers, q, json!([
                    {"orderId": 42, "price": "100", "qty": "2"},
                    {"orderId": 42, "price": "101", "qty": "3"},
                    {"orderId": 41, "price": "500", "qty": "9"}
                ]))
            }),
        )
        .route(
            "/api/v3/ticker/bookTicker",
            get(|| async {
                Json(json!({"symbol": "BTCUSDT", "bidPrice": "50.00", "askPrice": "51.00"}))
            }),
        )
        .route(
            "/api/v3/klines",
            get(|| async {
                Json(json!([
                    [1700000060000_i64, "2", "3", "1", "2.5", "10"],
                    [1700000000000_i64, "1", "2", "0.5", "2", "20"]
                ]))
            }),
        )
        .route(
            "/bad",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"code": -1121, "msg": "Invalid symbol."})),
                )
            }),
        )
        .route(
            "/text",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        )
        .route("/garbled", get(|| async { "not json" }))
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Address with nothing listening.
async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn gateway(base_url: &str) -> Arc<RestGateway> {
    Arc::new(
        RestGateway::new(
            base_url,
            API_KEY,
            Some(SignatureEngine::new(SECRET).unwrap()),
            Duration::from_secs(2),
        )
        .unwrap(),
    )
}

async fn manager() -> (OrderManager, Arc<PriceCache>) {
    let url = spawn_server(mock_exchange()).await;
    let prices = Arc::new(PriceCache::new());
    let manager = OrderManager::new(gateway(&url), ExchangeVariant::Alternate, prices.clone());
    (manager, prices)
}

#[tokio::test]
async fn test_status_code_mapping() {
    let url = spawn_server(mock_exchange()).await;
    let gw = gateway(&url);

    let ok = gw.execute(HttpMethod::Get, "/api/v3/ticker/bookTicker", Vec::new()).await;
    assert_eq!(ok.unwrap()["bidPrice"], "50.00");

    match gw.execute(HttpMethod::Get, "/bad", Vec::new()).await {
        Err(RestError::ExchangeApi { status, payload }) => {
            assert_eq!(status, 400);
            assert_eq!(payload["code"], -1121);
        }
        other => panic!("expected ExchangeApi, got {other:?}"),
    }

    match gw.execute(HttpMethod::Get, "/text", Vec::new()).await {
        Err(RestError::ExchangeApi { status, payload }) => {
            assert_eq!(status, 500);
            assert_eq!(payload, Value::String("upstream down".to_string()));
        }
        other => panic!("expected ExchangeApi, got {other:?}"),
    }

    let garbled = gw.execute(HttpMethod::Get, "/garbled", Vec::new()).await;
    assert!(matches!(garbled, Err(RestError::Decode(_))));
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let gw = gateway(&refused_url().await);
    let result = gw.execute(HttpMethod::Get, "/api/v3/exchangeInfo", Vec::new()).await;
    assert!(matches!(result, Err(RestError::Network(_))));
}

#[tokio::test]
async fn test_signed_request_is_verified_by_server() {
    let url = spawn_server(mock_exchange()).await;
    let gw = gateway(&url);

    let body = gw
        .execute_signed(HttpMethod::Get, "/api/v3/account", Vec::new())
        .await
        .unwrap();
    assert_eq!(body["balances"][0]["asset"], "USDT");

    let unsigned = gw.execute(HttpMethod::Get, "/api/v3/account", Vec::new()).await;
    assert!(matches!(unsigned, Err(RestError::ExchangeApi { status: 401, .. })));
}

#[tokio::test]
async fn test_signed_request_without_secret() {
    let url = spawn_server(mock_exchange()).await;
    let gw = RestGateway::new(&url, API_KEY, None, Duration::from_secs(2)).unwrap();
    let result = gw
        .execute_signed(HttpMethod::Get, "/api/v3/account", Vec::new())
        .await;
    assert!(matches!(result, Err(RestError::Configuration(_))));
}

#[tokio::test]
async fn test_catalog_refresh_sorted_and_skips_malformed() {
    let url = spawn_server(mock_exchange()).await;
    let catalog = ContractCatalog::new(gateway(&url), ExchangeVariant::Alternate);

    let contracts = catalog.refresh().await;
    let symbols: Vec<&String> = contracts.keys().collect();
    assert_eq!(symbols, ["BTCUSDT", "ETHUSDT"]);
    assert_eq!(contracts["ETHUSDT"].quantity_decimals(), 4);
    assert_eq!(catalog.get("BTCUSDT").unwrap().lot_size(), Size::new(dec!(0.001)));
}

#[tokio::test]
async fn test_catalog_refresh_failure_is_empty() {
    let catalog = ContractCatalog::new(gateway(&refused_url().await), ExchangeVariant::Alternate);
    assert!(catalog.refresh().await.is_empty());
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn test_place_order_reconciles_average_price() {
    let (manager, _) = manager().await;
    let contract = btc_contract();
    let status = manager
        .place_order(
            &contract,
            OrderType::Limit,
            OrderSide::Buy,
            Size::new(dec!(5.0004)),
            Some(Price::new(dec!(101.2345))),
            None,
        )
        .await
        .unwrap();

    assert_eq!(status.order_id, "42");
    assert!(status.is_filled());
    assert_eq!(status.avg_price, Some(Price::new(dec!(100.60))));
}

#[tokio::test]
async fn test_cancel_and_status() {
    let (manager, _) = manager().await;
    let contract = btc_contract();

    let cancelled = manager.cancel_order(&contract, "7").await.unwrap();
    assert_eq!(cancelled.status, "canceled");
    assert!(cancelled.avg_price.is_none());

    let status = manager.get_order_status(&contract, "7").await.unwrap();
    assert_eq!(status.status, "new");
    assert!(status.avg_price.is_none());
}

#[tokio::test]
async fn test_order_status_reconciles_filled_order() {
    let (manager, _) = manager().await;
    let status = manager.get_order_status(&btc_contract(), "42").await.unwrap();

    assert!(status.is_filled());
    assert_eq!(status.executed_qty, Size::new(dec!(5)));
    assert_eq!(status.avg_price, Some(Price::new(dec!(100.60))));
}

#[tokio::test]
async fn test_place_order_failure_is_none() {
    let contract = btc_contract();
    let place = |manager: OrderManager| {
        let contract = contract.clone();
        async move {
            manager
                .place_order(
                    &contract,
                    OrderType::Limit,
                    OrderSide::Sell,
                    Size::new(dec!(1)),
                    Some(Price::new(dec!(100))),
                    None,
                )
                .await
        }
    };

    let unreachable = OrderManager::new(
        gateway(&refused_url().await),
        ExchangeVariant::Alternate,
        Arc::new(PriceCache::new()),
    );
    assert!(place(unreachable).await.is_none());

    // Wrong secret: the exchange answers 401
    let url = spawn_server(mock_exchange()).await;
    let wrong_key = Arc::new(
        RestGateway::new(
            &url,
            API_KEY,
            Some(SignatureEngine::new("other-secret").unwrap()),
            Duration::from_secs(2),
        )
        .unwrap(),
    );
    let rejected = OrderManager::new(wrong_key, ExchangeVariant::Alternate, Arc::new(PriceCache::new()));
    assert!(place(rejected).await.is_none());
}

#[tokio::test]
async fn test_order_failures_are_none() {
    let gw = gateway(&refused_url().await);
    let manager = OrderManager::new(gw, ExchangeVariant::Alternate, Arc::new(PriceCache::new()));
    let contract = btc_contract();

    assert!(manager.cancel_order(&contract, "1").await.is_none());
    assert!(manager.get_balances().await.is_none());
    assert!(manager
        .get_trade_size(&contract, Price::new(dec!(100)), dec!(10))
        .await
        .is_none());
}

#[tokio::test]
async fn test_trade_size_from_quote_balance() {
    let (manager, _) = manager().await;
    let size = manager
        .get_trade_size(&btc_contract(), Price::new(dec!(30000)), dec!(10))
        .await
        .unwrap();
    assert_eq!(size, Size::new(dec!(0.003)));

    assert!(manager
        .get_trade_size(&btc_contract(), Price::ZERO, dec!(10))
        .await
        .is_none());
}

#[tokio::test]
async fn test_trade_size_without_quote_balance() {
    let (manager, _) = manager().await;
    let btc_eur = cexlink_core::Contract::new(
        "BTCEUR",
        "BTC",
        "EUR",
        Price::new(dec!(0.01)),
        Size::new(dec!(0.001)),
        ExchangeVariant::Alternate,
    )
    .unwrap();

    assert!(manager
        .get_trade_size(&btc_eur, Price::new(dec!(30000)), dec!(10))
        .await
        .is_none());
}

#[tokio::test]
async fn test_bid_ask_snapshot_updates_cache() {
    let (manager, prices) = manager().await;
    let quote = manager.get_bid_ask(&btc_contract()).await.unwrap();

    assert_eq!(quote.bid, Some(Price::new(dec!(50))));
    assert_eq!(prices.get("BTCUSDT"), Some(quote));
}

#[tokio::test]
async fn test_candles_sorted_ascending() {
    let (manager, _) = manager().await;
    let candles = manager
        .get_candles(&btc_contract(), Timeframe::M1, 2)
        .await
        .unwrap();

    assert_eq!(candles.len(), 2);
    assert!(candles[0].timestamp < candles[1].timestamp);
    assert_eq!(candles[0].close, Price::new(dec!(2)));
}

fn btc_contract() -> cexlink_core::Contract {
    cexlink_core::Contract::new(
        "BTCUSDT",
        "BTC",
        "USDT",
        Price::new(dec!(0.01)),
        Size::new(dec!(0.001)),
        ExchangeVariant::Alternate,
    )
    .unwrap()
}
