//! Latest order-book snapshot per market
//!
//! Each snapshot fully replaces the previous one for its market; there is no
//! merging or delta application. Markets never seen yield `None`.

use std::collections::BTreeMap;

use tracing::trace;
use types::book::OrderBookSnapshot;
use types::ids::MarketKey;

/// Latest-wins store of order-book snapshots.
#[derive(Debug, Default)]
pub struct OrderBookStore {
    books: BTreeMap<MarketKey, OrderBookSnapshot>,
}

impl OrderBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot, replacing whatever was held for the same market.
    pub fn put(&mut self, key: &MarketKey, snapshot: OrderBookSnapshot) {
        trace!(
            market = %key,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "Order book replaced"
        );
        self.books.insert(key.clone(), snapshot);
    }

    /// Latest snapshot for a market.
    pub fn get(&self, key: &MarketKey) -> Option<&OrderBookSnapshot> {
        self.books.get(key)
    }

    /// Number of markets with a stored snapshot.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
