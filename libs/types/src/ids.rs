//! Market identity
//!
//! Every piece of per-market state (trade buffers, book snapshots, catalog
//! entries, the active selection) is keyed by a `MarketKey`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::MarketKeyError;

/// Identifies one market: an (exchange, symbol) pair.
///
/// Equality, ordering and hashing are by value. Keys built from live events
/// go through [`MarketKey::try_new`], which rejects empty parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketKey {
    exchange_id: String,
    symbol: String,
}

impl MarketKey {
    /// Create a key, rejecting an empty (or all-whitespace) exchange or symbol.
    pub fn try_new(
        exchange_id: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Result<Self, MarketKeyError> {
        let exchange_id = exchange_id.into();
        let symbol = symbol.into();

        if exchange_id.trim().is_empty() {
            return Err(MarketKeyError::EmptyExchange);
        }
        if symbol.trim().is_empty() {
            return Err(MarketKeyError::EmptySymbol {
                exchange_id,
            });
        }

        Ok(Self {
            exchange_id,
            symbol,
        })
    }

    /// Create a key from known-good parts.
    ///
    /// # Panics
    /// Panics if either part is empty.
    pub fn new(exchange_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        match Self::try_new(exchange_id, symbol) {
            Ok(key) => key,
            Err(err) => panic!("invalid MarketKey: {err}"),
        }
    }

    /// Parse the `EXCHANGE:SYMBOL` form used on the command line.
    ///
    /// Only the first `:` separates the parts, so symbols such as
    /// `BTC/USDT:USDT` survive intact.
    pub fn parse(s: &str) -> Result<Self, MarketKeyError> {
        let (exchange_id, symbol) = s
            .split_once(':')
            .ok_or_else(|| MarketKeyError::MissingSeparator(s.to_string()))?;
        Self::try_new(exchange_id.trim(), symbol.trim())
    }

    pub fn exchange_id(&self) -> &str {
        &self.exchange_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Whether this key names the given exchange and symbol.
    pub fn matches(&self, exchange_id: &str, symbol: &str) -> bool {
        self.exchange_id == exchange_id && self.symbol == symbol
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.exchange_id, self.symbol)
    }
}
