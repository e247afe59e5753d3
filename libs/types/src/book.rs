//! Order-book snapshot types
//!
//! Snapshots are latest-wins: each one describes the whole visible book for
//! its market and replaces the previous one outright. Levels are kept in the
//! order the transport delivered them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoercionError;
use crate::ids::MarketKey;
use crate::numeric::{coerce_non_negative, CoercionMode};

/// Side of the book a level or depth curve belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

/// A single price level: price and resting size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub size: Decimal,
}

impl Level {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Coerce a `[price, size, ...]` array. Trailing elements are ignored.
    pub fn from_value(value: &Value, mode: CoercionMode) -> Result<Self, CoercionError> {
        let items = match value.as_array() {
            Some(items) if items.len() >= 2 => items,
            _ => return Err(CoercionError::MalformedLevel(value.to_string())),
        };

        let price = coerce_non_negative(items.first(), "price", mode)?;
        let size = coerce_non_negative(items.get(1), "size", mode)?;
        Ok(Self { price, size })
    }
}

/// Coerce one side of a snapshot payload.
///
/// Lenient mode skips levels that fail coercion; strict mode rejects the
/// whole side on the first bad level.
pub fn parse_levels(values: &[Value], mode: CoercionMode) -> Result<Vec<Level>, CoercionError> {
    let mut levels = Vec::with_capacity(values.len());
    for value in values {
        match Level::from_value(value, mode) {
            Ok(level) => levels.push(level),
            Err(err) => match mode {
                CoercionMode::Strict => return Err(err),
                CoercionMode::Lenient => continue,
            },
        }
    }
    Ok(levels)
}

/// Latest visible book for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub market: MarketKey,
    /// Bid levels as received.
    pub bids: Vec<Level>,
    /// Ask levels as received.
    pub asks: Vec<Level>,
}

impl OrderBookSnapshot {
    pub fn new(market: MarketKey, bids: Vec<Level>, asks: Vec<Level>) -> Self {
        Self { market, bids, asks }
    }

    /// Highest-priced bid, regardless of delivery order.
    pub fn best_bid(&self) -> Option<Level> {
        self.bids.iter().copied().max_by(|a, b| a.price.cmp(&b.price))
    }

    /// Lowest-priced ask, regardless of delivery order.
    pub fn best_ask(&self) -> Option<Level> {
        self.asks.iter().copied().min_by(|a, b| a.price.cmp(&b.price))
    }

    /// One-line top-of-book readout.
    ///
    /// Format: `{exchange} {symbol} bid {p} x {s} | ask {p} x {s} (bids:{n} asks:{m})`,
    /// with `-` standing in for an empty side.
    pub fn describe_top(&self) -> String {
        fn fmt_level(level: Option<Level>) -> String {
            match level {
                Some(l) => format!("{} x {}", l.price, l.size),
                None => "-".to_string(),
            }
        }

        format!(
            "{} {} bid {} | ask {} (bids:{} asks:{})",
            self.market.exchange_id(),
            self.market.symbol(),
            fmt_level(self.best_bid()),
            fmt_level(self.best_ask()),
            self.bids.len(),
            self.asks.len()
        )
    }
}
