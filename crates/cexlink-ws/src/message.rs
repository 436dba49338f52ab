//! Outbound control messages and inbound frame classification.

use crate::error::WsResult;
use crate::subscription::SubscriptionKey;
use cexlink_core::{ExchangeVariant, StreamEvent};
use serde_json::Value;

/// Serialized subscribe/unsubscribe request for a batch of pairs.
pub fn subscription_request(
    variant: ExchangeVariant,
    id: u64,
    keys: &[SubscriptionKey],
    subscribe: bool,
) -> String {
    let streams: Vec<String> = keys
        .iter()
        .map(|key| variant.stream_name(&key.symbol, key.channel))
        .collect();
    variant
        .subscription_message(id, &streams, subscribe)
        .to_string()
}

/// Classified inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Canonical market events, in frame order.
    Events(Vec<StreamEvent>),
    /// Application heartbeat; the payload is the reply to send back.
    Heartbeat(Value),
    /// Acks, results and anything else without market data.
    Control,
}

/// Parse and classify a text frame.
///
/// # Errors
/// `Json` if the frame is not valid JSON.
pub fn classify(variant: ExchangeVariant, text: &str) -> WsResult<Inbound> {
    let frame: Value = serde_json::from_str(text)?;

    if let Some(reply) = variant.heartbeat_reply(&frame) {
        return Ok(Inbound::Heartbeat(reply));
    }

    let events = variant.normalize_stream(&frame);
    if events.is_empty() {
        Ok(Inbound::Control)
    } else {
        Ok(Inbound::Events(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WsError;
    use cexlink_core::{Channel, Price};
    use rust_decimal_macros::dec;

    #[test]
    fn test_alternate_subscription_request() {
        let keys = vec![
            SubscriptionKey::new("BTCUSDT", Channel::BookTicker),
            SubscriptionKey::new("ETHUSDT", Channel::AggTrade),
        ];
        let text = subscription_request(ExchangeVariant::Alternate, 7, &keys, true);
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["method"], "SUBSCRIBE");
        assert_eq!(value["id"], 7);
        assert_eq!(
            value["params"],
            serde_json::json!(["btcusdt@bookTicker", "ethusdt@aggTrade"])
        );

        let text = subscription_request(ExchangeVariant::Alternate, 8, &keys[..1], false);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["method"], "UNSUBSCRIBE");
    }

    #[test]
    fn test_primary_subscription_request() {
        let keys = vec![SubscriptionKey::new("BTC_USDT", Channel::BookTicker)];
        let text = subscription_request(ExchangeVariant::Primary, 1, &keys, true);
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["method"], "subscribe");
        assert_eq!(value["params"]["channels"], serde_json::json!(["ticker.BTC_USDT"]));
    }

    #[test]
    fn test_classify_book_ticker() {
        let text = r#"{"u":400900217,"s":"BNBUSDT","b":"25.35190000","B":"31.21000000","a":"25.36520000","A":"40.66000000"}"#;
        let inbound = classify(ExchangeVariant::Alternate, text).unwrap();

        assert_eq!(
            inbound,
            Inbound::Events(vec![StreamEvent::BookTicker {
                symbol: "BNBUSDT".to_string(),
                bid: Price::new(dec!(25.35190000)),
                ask: Price::new(dec!(25.36520000)),
            }])
        );
    }

    #[test]
    fn test_classify_subscription_ack_is_control() {
        let inbound = classify(ExchangeVariant::Alternate, r#"{"result":null,"id":1}"#).unwrap();
        assert_eq!(inbound, Inbound::Control);
    }

    #[test]
    fn test_classify_primary_heartbeat() {
        let text = r#"{"id":1587523073344,"method":"public/heartbeat","code":0}"#;
        let inbound = classify(ExchangeVariant::Primary, text).unwrap();

        let Inbound::Heartbeat(reply) = inbound else {
            panic!("expected heartbeat, got {inbound:?}");
        };
        assert_eq!(reply["method"], "public/respond-heartbeat");
        assert_eq!(reply["id"], 1587523073344_u64);

        // The same frame is plain control traffic on the alternate variant
        let inbound = classify(ExchangeVariant::Alternate, text).unwrap();
        assert_eq!(inbound, Inbound::Control);
    }

    #[test]
    fn test_classify_garbage() {
        let result = classify(ExchangeVariant::Alternate, "not json {");
        assert!(matches!(result, Err(WsError::Json(_))));
    }
}
