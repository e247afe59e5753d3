//! Per-market trade buffers
//!
//! Keeps a bounded FIFO of the most recent trades for every market seen on
//! the stream. Trades are stored in arrival order; no reordering happens on
//! ingestion, so consumers that care about time order (the candle
//! aggregator) must sort for themselves.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;
use types::ids::MarketKey;
use types::trade::TradeEvent;

/// Default number of trades retained per market.
pub const DEFAULT_TRADE_BOUND: usize = 100;

/// Bounded trade history for every market.
///
/// Uses `BTreeMap` so iteration over markets is deterministic.
#[derive(Debug)]
pub struct TradeBufferStore {
    buffers: BTreeMap<MarketKey, VecDeque<TradeEvent>>,
    /// Maximum trades retained per market.
    bound: usize,
}

impl TradeBufferStore {
    /// Create a store retaining at most `bound` trades per market.
    ///
    /// A bound of zero is treated as one.
    pub fn new(bound: usize) -> Self {
        Self {
            buffers: BTreeMap::new(),
            bound: bound.max(1),
        }
    }

    /// Append a trade at the tail of its market's buffer, evicting the
    /// oldest trade once the bound is exceeded.
    pub fn append(&mut self, key: &MarketKey, trade: TradeEvent) {
        let bound = self.bound;
        let buffer = self
            .buffers
            .entry(key.clone())
            .or_insert_with(|| VecDeque::with_capacity(bound + 1));

        buffer.push_back(trade);
        while buffer.len() > bound {
            buffer.pop_front();
        }
    }

    /// Current contents for a market, oldest first. Empty if none recorded.
    pub fn get(&self, key: &MarketKey) -> Vec<TradeEvent> {
        self.iter(key).cloned().collect()
    }

    /// Borrowing iterator over a market's buffer, oldest first.
    pub fn iter(&self, key: &MarketKey) -> impl Iterator<Item = &TradeEvent> + '_ {
        self.buffers.get(key).into_iter().flat_map(|buffer| buffer.iter())
    }

    /// Most recently appended trade for a market.
    pub fn latest(&self, key: &MarketKey) -> Option<&TradeEvent> {
        self.buffers.get(key).and_then(|buffer| buffer.back())
    }

    /// Number of trades currently held for a market.
    pub fn len(&self, key: &MarketKey) -> usize {
        self.buffers.get(key).map_or(0, VecDeque::len)
    }

    /// Whether no trade has been recorded for a market.
    pub fn is_empty(&self, key: &MarketKey) -> bool {
        self.len(key) == 0
    }

    /// Change the bound. Shrinking trims every buffer oldest-first.
    pub fn set_bound(&mut self, bound: usize) {
        let bound = bound.max(1);
        if bound < self.bound {
            let mut trimmed = 0usize;
            for buffer in self.buffers.values_mut() {
                while buffer.len() > bound {
                    buffer.pop_front();
                    trimmed += 1;
                }
            }
            debug!(old_bound = self.bound, new_bound = bound, trimmed, "Trade buffers trimmed");
        }
        self.bound = bound;
    }

    /// Current per-market bound.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Number of markets with at least one recorded trade.
    pub fn market_count(&self) -> usize {
        self.buffers.len()
    }
}

impl Default for TradeBufferStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRADE_BOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::trade::Side;

    fn key() -> MarketKey {
        MarketKey::new("binance", "BTC/USDT")
    }

    fn trade(ts: i64) -> TradeEvent {
        TradeEvent::new(key(), Some(Side::Buy), Decimal::from(50000), Decimal::ONE, ts)
    }

    fn timestamps(store: &TradeBufferStore, key: &MarketKey) -> Vec<i64> {
        store.iter(key).map(|t| t.timestamp).collect()
    }

    #[test]
    fn test_empty_market_yields_empty_sequence() {
        let store = TradeBufferStore::default();
        assert!(store.get(&key()).is_empty());
        assert!(store.is_empty(&key()));
        assert!(store.latest(&key()).is_none());
    }

    #[test]
    fn test_append_keeps_arrival_order() {
        let mut store = TradeBufferStore::default();
        store.append(&key(), trade(3));
        store.append(&key(), trade(1));
        store.append(&key(), trade(2));

        assert_eq!(timestamps(&store, &key()), vec![3, 1, 2]);
        assert_eq!(store.latest(&key()).unwrap().timestamp, 2);
    }

    #[test]
    fn test_fifo_eviction() {
        // A, B, C, D into a bound of 3 leaves B, C, D
        let mut store = TradeBufferStore::new(3);
        for ts in [1, 2, 3, 4] {
            store.append(&key(), trade(ts));
        }

        assert_eq!(store.len(&key()), 3);
        assert_eq!(timestamps(&store, &key()), vec![2, 3, 4]);
    }

    #[test]
    fn test_markets_are_independent() {
        let mut store = TradeBufferStore::new(2);
        let other = MarketKey::new("okx", "BTC/USDT");

        for ts in 0..5 {
            store.append(&key(), trade(ts));
        }
        store.append(&other, trade(100));

        assert_eq!(store.len(&key()), 2);
        assert_eq!(store.len(&other), 1);
        assert_eq!(store.market_count(), 2);
    }

    #[test]
    fn test_shrinking_bound_trims_oldest() {
        let mut store = TradeBufferStore::new(5);
        for ts in 0..5 {
            store.append(&key(), trade(ts));
        }

        store.set_bound(2);
        assert_eq!(timestamps(&store, &key()), vec![3, 4]);

        // Growing again does not resurrect anything
        store.set_bound(10);
        assert_eq!(store.len(&key()), 2);
        assert_eq!(store.bound(), 10);
    }

    #[test]
    fn test_zero_bound_clamped() {
        let mut store = TradeBufferStore::new(0);
        store.append(&key(), trade(1));
        store.append(&key(), trade(2));
        assert_eq!(timestamps(&store, &key()), vec![2]);
    }
}
