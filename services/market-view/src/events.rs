//! Inbound message and internal event definitions
//!
//! `InboundMessage` mirrors the JSON objects delivered by the transport,
//! discriminated by their `type` field. Payload fields stay as raw JSON
//! values until ingestion coerces them, so a single bad field can be reported
//! precisely instead of failing the whole decode.
//!
//! `MarketEvent` is the coerced form consumed by the registry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::book::OrderBookSnapshot;
use types::ids::MarketKey;
use types::trade::TradeEvent;

/// Exchange id → symbols, in announcement order.
pub type CatalogAnnouncement = IndexMap<String, Vec<String>>;

/// One message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Bulk catalog seed.
    Config {
        #[serde(default)]
        exchanges: CatalogAnnouncement,
    },

    /// A public trade print.
    Trade {
        exchange_id: String,
        symbol: String,
        payload: RawTradePayload,
    },

    /// A full order-book snapshot.
    Orderbook {
        exchange_id: String,
        symbol: String,
        payload: RawBookPayload,
    },

    /// Any other `type`; ignored.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Label for logging.
    pub fn type_label(&self) -> &'static str {
        match self {
            InboundMessage::Config { .. } => "config",
            InboundMessage::Trade { .. } => "trade",
            InboundMessage::Orderbook { .. } => "orderbook",
            InboundMessage::Unknown => "unknown",
        }
    }
}

/// Trade payload before coercion. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTradePayload {
    #[serde(default)]
    pub side: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Order-book payload before coercion. Each level is `[price, size, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBookPayload {
    #[serde(default)]
    pub bids: Vec<Value>,
    #[serde(default)]
    pub asks: Vec<Value>,
}

/// A coerced event ready for the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    /// Catalog seed: exchanges and their symbols.
    Catalog(CatalogAnnouncement),
    /// A trade for one market.
    Trade(TradeEvent),
    /// A replacement snapshot for one market.
    OrderBook(OrderBookSnapshot),
}

impl MarketEvent {
    /// The market this event belongs to; `None` for catalog seeds.
    pub fn market(&self) -> Option<&MarketKey> {
        match self {
            MarketEvent::Catalog(_) => None,
            MarketEvent::Trade(trade) => Some(&trade.market),
            MarketEvent::OrderBook(book) => Some(&book.market),
        }
    }

    /// Label for logging.
    pub fn event_type_label(&self) -> &'static str {
        match self {
            MarketEvent::Catalog(_) => "catalog",
            MarketEvent::Trade(_) => "trade",
            MarketEvent::OrderBook(_) => "orderbook",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use types::trade::Side;

    #[test]
    fn test_decode_config() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "type": "config",
            "exchanges": {"okx": ["ETH/USDT"], "binance": ["BTC/USDT", "ETH/USDT"]}
        }))
        .unwrap();

        match msg {
            InboundMessage::Config { exchanges } => {
                let order: Vec<&str> = exchanges.keys().map(String::as_str).collect();
                assert_eq!(order, vec!["okx", "binance"]);
                assert_eq!(exchanges["binance"].len(), 2);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_decode_trade_ignores_extra_fields() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "type": "trade",
            "exchange_id": "binance",
            "symbol": "BTC/USDT",
            "market_type": "spot",
            "payload": {"side": "buy", "price": "50000", "timestamp": 1, "local_ts": 2}
        }))
        .unwrap();

        match msg {
            InboundMessage::Trade { payload, .. } => {
                assert_eq!(payload.side, Some(json!("buy")));
                assert!(payload.amount.is_none());
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert!(
            serde_json::from_value::<InboundMessage>(json!({"type": "trade", "symbol": "X"}))
                .is_err()
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let msg: InboundMessage =
            serde_json::from_value(json!({"type": "heartbeat", "seq": 4})).unwrap();
        assert_eq!(msg, InboundMessage::Unknown);
        assert_eq!(msg.type_label(), "unknown");
    }

    #[test]
    fn test_decode_orderbook_defaults() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "type": "orderbook",
            "exchange_id": "okx",
            "symbol": "ETH/USDT",
            "payload": {"bids": [[1, 2]]}
        }))
        .unwrap();

        match msg {
            InboundMessage::Orderbook { payload, .. } => {
                assert_eq!(payload.bids.len(), 1);
                assert!(payload.asks.is_empty());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_market_event_market() {
        let key = MarketKey::new("binance", "BTC/USDT");
        let trade = MarketEvent::Trade(TradeEvent::new(
            key.clone(),
            Some(Side::Sell),
            Decimal::ONE,
            Decimal::ONE,
            0,
        ));
        assert_eq!(trade.market(), Some(&key));
        assert_eq!(trade.event_type_label(), "trade");
        assert!(MarketEvent::Catalog(CatalogAnnouncement::new()).market().is_none());
    }
}
