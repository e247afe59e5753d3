//! Event ingestion layer
//!
//! Decodes raw transport messages and coerces their payloads into
//! `MarketEvent`s. Failures are local to one message:
//! - malformed JSON drops the whole message
//! - a non-coercible price or timestamp drops that one event
//! - an unrecognised side drops that one event; a missing or null side is
//!   kept as unknown
//! - a missing or non-numeric amount becomes zero volume
//! - unknown message types are ignored
//!
//! Nothing here is fatal and nothing is retried.

use serde_json::Value;
use tracing::{debug, warn};
use types::book::{parse_levels, OrderBookSnapshot};
use types::errors::{CoercionError, MarketKeyError};
use types::ids::MarketKey;
use types::numeric::{coerce_amount, coerce_non_negative, coerce_timestamp_ms, CoercionMode};
use types::trade::{Side, TradeEvent};
use uuid::Uuid;

use crate::events::{CatalogAnnouncement, InboundMessage, MarketEvent, RawBookPayload, RawTradePayload};

/// Errors that drop a single inbound message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestionError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("invalid market: {0}")]
    MarketKey(#[from] MarketKeyError),

    #[error("invalid payload: {0}")]
    Coercion(#[from] CoercionError),
}

/// An accepted event stamped for log correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedEvent {
    /// UUID v7, time-ordered.
    pub event_id: Uuid,
    pub event: MarketEvent,
}

/// Outcome of ingesting one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// Event decoded and coerced.
    Accepted(IngestedEvent),
    /// Message of an unknown type; nothing to do.
    Ignored,
}

/// Decodes and coerces inbound messages.
#[derive(Debug)]
pub struct Ingester {
    mode: CoercionMode,
    /// Total messages accepted.
    events_accepted: u64,
    /// Total messages of unknown type.
    events_ignored: u64,
    /// Total messages dropped by an error.
    events_rejected: u64,
}

impl Ingester {
    pub fn new(mode: CoercionMode) -> Self {
        Self {
            mode,
            events_accepted: 0,
            events_ignored: 0,
            events_rejected: 0,
        }
    }

    /// Ingest one raw JSON message.
    pub fn ingest(&mut self, raw: &str) -> Result<Ingested, IngestionError> {
        let decoded = serde_json::from_str::<InboundMessage>(raw)
            .map_err(|e| IngestionError::Malformed(e.to_string()));
        let converted = decoded.and_then(|msg| self.convert(msg));
        self.finish(converted)
    }

    /// Change coercion strictness for subsequent messages.
    pub fn set_mode(&mut self, mode: CoercionMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> CoercionMode {
        self.mode
    }

    /// Total messages accepted since creation.
    pub fn events_accepted(&self) -> u64 {
        self.events_accepted
    }

    /// Total unknown-type messages since creation.
    pub fn events_ignored(&self) -> u64 {
        self.events_ignored
    }

    /// Total messages dropped since creation.
    pub fn events_rejected(&self) -> u64 {
        self.events_rejected
    }

    fn finish(
        &mut self,
        result: Result<Option<MarketEvent>, IngestionError>,
    ) -> Result<Ingested, IngestionError> {
        match result {
            Ok(Some(event)) => {
                self.events_accepted += 1;
                let event_id = Uuid::now_v7();
                debug!(
                    %event_id,
                    event_type = event.event_type_label(),
                    market = ?event.market(),
                    "Event accepted"
                );
                Ok(Ingested::Accepted(IngestedEvent { event_id, event }))
            }
            Ok(None) => {
                self.events_ignored += 1;
                debug!("Ignoring message of unknown type");
                Ok(Ingested::Ignored)
            }
            Err(err) => {
                self.events_rejected += 1;
                match &err {
                    IngestionError::Malformed(reason) => {
                        debug!(reason = %reason, "Dropping malformed message")
                    }
                    other => warn!(error = %other, "Dropping event"),
                }
                Err(err)
            }
        }
    }

    fn convert(&self, msg: InboundMessage) -> Result<Option<MarketEvent>, IngestionError> {
        let event = match msg {
            InboundMessage::Config { exchanges } => MarketEvent::Catalog(clean_catalog(exchanges)),
            InboundMessage::Trade {
                exchange_id,
                symbol,
                payload,
            } => {
                let market = MarketKey::try_new(exchange_id, symbol)?;
                MarketEvent::Trade(coerce_trade(market, &payload, self.mode)?)
            }
            InboundMessage::Orderbook {
                exchange_id,
                symbol,
                payload,
            } => {
                let market = MarketKey::try_new(exchange_id, symbol)?;
                MarketEvent::OrderBook(coerce_book(market, &payload, self.mode)?)
            }
            InboundMessage::Unknown => return Ok(None),
        };
        Ok(Some(event))
    }
}

impl Default for Ingester {
    fn default() -> Self {
        Self::new(CoercionMode::default())
    }
}

/// Coerce a raw trade payload.
pub fn coerce_trade(
    market: MarketKey,
    payload: &RawTradePayload,
    mode: CoercionMode,
) -> Result<TradeEvent, CoercionError> {
    let side = match &payload.side {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.parse::<Side>()?),
        Some(other) => return Err(CoercionError::InvalidSide(other.to_string())),
    };
    let price = coerce_non_negative(payload.price.as_ref(), "price", mode)?;
    let amount = coerce_amount(payload.amount.as_ref(), mode)?;
    let timestamp = coerce_timestamp_ms(payload.timestamp.as_ref(), "timestamp", mode)?;

    Ok(TradeEvent::new(market, side, price, amount, timestamp))
}

/// Coerce a raw order-book payload.
pub fn coerce_book(
    market: MarketKey,
    payload: &RawBookPayload,
    mode: CoercionMode,
) -> Result<OrderBookSnapshot, CoercionError> {
    let bids = parse_levels(&payload.bids, mode)?;
    let asks = parse_levels(&payload.asks, mode)?;
    Ok(OrderBookSnapshot::new(market, bids, asks))
}

/// Drop blank exchange ids and symbols from a catalog seed.
fn clean_catalog(exchanges: CatalogAnnouncement) -> CatalogAnnouncement {
    exchanges
        .into_iter()
        .filter(|(exchange_id, _)| !exchange_id.trim().is_empty())
        .map(|(exchange_id, symbols)| {
            let symbols = symbols
                .into_iter()
                .filter(|symbol| !symbol.trim().is_empty())
                .collect();
            (exchange_id, symbols)
        })
        .collect()
}
