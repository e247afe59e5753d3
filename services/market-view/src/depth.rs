//! Cumulative depth curves
//!
//! Turns the raw levels of an order-book snapshot into monotonic
//! `(price, cumulative size)` curves, one per side. Each side is walked
//! outward from its best price:
//! - bids by descending price
//! - asks by ascending price
//!
//! The first `max_levels` levels are taken as delivered, then sorted. Depth is
//! recomputed from the latest snapshot on demand and never stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::book::{BookSide, Level, OrderBookSnapshot};

/// Default number of levels per side included in a depth curve.
pub const DEFAULT_DEPTH_LEVELS: usize = 20;

/// One point of a depth curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthPoint {
    pub price: Decimal,
    /// Total size available at this price or better.
    pub cumulative: Decimal,
}

/// Build the depth curve for one side, walking outward from the best price.
/// The running total saturates at `Decimal::MAX`.
pub fn depth(levels: &[Level], max_levels: usize, side: BookSide) -> Vec<DepthPoint> {
    let mut included: Vec<Level> = levels.iter().take(max_levels).copied().collect();
    match side {
        BookSide::Bid => included.sort_by(|a, b| b.price.cmp(&a.price)),
        BookSide::Ask => included.sort_by(|a, b| a.price.cmp(&b.price)),
    }

    let mut running = Decimal::ZERO;
    included
        .into_iter()
        .map(|level| {
            running = running.checked_add(level.size).unwrap_or(Decimal::MAX);
            DepthPoint {
                price: level.price,
                cumulative: running,
            }
        })
        .collect()
}

/// Bid and ask depth curves for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthView {
    /// Best bid first (descending price).
    pub bids: Vec<DepthPoint>,
    /// Best ask first (ascending price).
    pub asks: Vec<DepthPoint>,
}

impl DepthView {
    /// Build both curves from a snapshot.
    pub fn build(snapshot: &OrderBookSnapshot, max_levels: usize) -> Self {
        Self {
            bids: depth(&snapshot.bids, max_levels, BookSide::Bid),
            asks: depth(&snapshot.asks, max_levels, BookSide::Ask),
        }
    }

    /// Depth for an optional snapshot; a missing book yields empty curves.
    pub fn from_snapshot(snapshot: Option<&OrderBookSnapshot>, max_levels: usize) -> Self {
        snapshot
            .map(|book| Self::build(book, max_levels))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Bid curve in ascending price order, for plotting both sides
    /// left-to-right on one axis.
    pub fn bids_ascending(&self) -> Vec<DepthPoint> {
        self.bids.iter().rev().copied().collect()
    }
}
