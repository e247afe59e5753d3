//! Trade types
//!
//! A `TradeEvent` is one public trade print as delivered by the transport,
//! already coerced into exact numeric types.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::CoercionError;
use crate::ids::MarketKey;

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl FromStr for Side {
    type Err = CoercionError;

    /// Case-insensitive `buy` / `sell`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(CoercionError::InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingested trade. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub market: MarketKey,
    /// `None` when the venue does not report the aggressor.
    pub side: Option<Side>,
    pub price: Decimal,
    /// Traded quantity; zero when the transport omitted it.
    pub amount: Decimal,
    /// Exchange timestamp in Unix milliseconds.
    pub timestamp: i64,
}

impl TradeEvent {
    pub fn new(
        market: MarketKey,
        side: Option<Side>,
        price: Decimal,
        amount: Decimal,
        timestamp: i64,
    ) -> Self {
        Self {
            market,
            side,
            price,
            amount,
            timestamp,
        }
    }

    /// One-line description for the "latest trade" readout.
    ///
    /// Format: `{exchange} {symbol} {side} @ {price} ({amount})`, with `-`
    /// standing in for an unknown side.
    pub fn describe(&self) -> String {
        format!(
            "{} {} {} @ {} ({})",
            self.market.exchange_id(),
            self.market.symbol(),
            self.side.map_or("-", |side| side.as_str()),
            self.price,
            self.amount
        )
    }
}
