//! OHLCV candle aggregation
//!
//! Converts a trade sequence into an ordered OHLCV series for one timeframe.
//! Candles are derived on demand from the trade buffer and never stored, so
//! aggregation is a pure function of its inputs.
//!
//! Candle boundaries are aligned to epoch: a trade at `t` lands in the bucket
//! starting at `floor(t / timeframe) * timeframe`. Empty intervals are not
//! backfilled; buckets without trades simply do not appear.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::trade::TradeEvent;

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start in Unix milliseconds.
    pub bucket_start: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trade_count: u64,
}

impl Candle {
    /// Open a candle from the first trade folded into a bucket.
    fn open_with(bucket_start: i64, price: Decimal, amount: Decimal) -> Self {
        Self {
            bucket_start,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: amount,
            trade_count: 1,
        }
    }

    /// Fold another trade into the candle.
    fn update(&mut self, price: Decimal, amount: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume = self.volume.checked_add(amount).unwrap_or(Decimal::MAX);
        self.trade_count += 1;
    }

    /// Exclusive end of the bucket for a given timeframe.
    pub fn bucket_end(&self, timeframe_ms: i64) -> i64 {
        self.bucket_start.saturating_add(timeframe_ms)
    }

    /// Whether `timestamp` falls inside this candle's bucket.
    pub fn contains(&self, timestamp: i64, timeframe_ms: i64) -> bool {
        timestamp >= self.bucket_start && timestamp < self.bucket_end(timeframe_ms)
    }

    /// Validate candle integrity (OHLCV invariants).
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= Decimal::ZERO
            && self.trade_count > 0
    }
}

/// Align a timestamp to the start of its bucket (floor, also for negatives).
///
/// `None` for a non-positive timeframe or when the start is not representable.
pub fn bucket_start(timestamp: i64, timeframe_ms: i64) -> Option<i64> {
    if timeframe_ms <= 0 {
        return None;
    }
    timestamp.div_euclid(timeframe_ms).checked_mul(timeframe_ms)
}

/// Aggregate trades into at most `max_candles` candles of `timeframe_ms`.
///
/// Trades are stably sorted by timestamp first, so ties keep arrival order
/// and slightly out-of-order delivery cannot corrupt bucket boundaries.
/// Only the most recent `max_candles` buckets are returned, oldest first.
///
/// A non-positive timeframe or a zero candle count yields an empty series.
pub fn aggregate<'a, I>(trades: I, timeframe_ms: i64, max_candles: usize) -> Vec<Candle>
where
    I: IntoIterator<Item = &'a TradeEvent>,
{
    if timeframe_ms <= 0 || max_candles == 0 {
        return Vec::new();
    }

    let mut sorted: Vec<&TradeEvent> = trades.into_iter().collect();
    sorted.sort_by_key(|trade| trade.timestamp);

    // BTreeMap keeps buckets in ascending start order
    let mut buckets: BTreeMap<i64, Candle> = BTreeMap::new();
    for trade in sorted {
        let Some(start) = bucket_start(trade.timestamp, timeframe_ms) else {
            debug!(timestamp = trade.timestamp, timeframe_ms, "Skipping trade outside bucket range");
            continue;
        };
        buckets
            .entry(start)
            .and_modify(|candle| candle.update(trade.price, trade.amount))
            .or_insert_with(|| Candle::open_with(start, trade.price, trade.amount));
    }

    let skip = buckets.len().saturating_sub(max_candles);
    buckets.into_values().skip(skip).collect()
}
