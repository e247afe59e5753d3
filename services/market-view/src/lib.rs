//! Market View Engine
//!
//! Consumes a live stream of exchange messages and maintains bounded,
//! per-market derived views for rendering:
//! - OHLCV candles bucketed by a configurable timeframe
//! - Cumulative bid/ask depth curves
//! - One-line latest-trade and top-of-book readouts
//!
//! Only the selected market is ever aggregated; every other market costs a
//! store write per event.
//!
//! # Architecture
//!
//! ```text
//!   Transport messages      Select / Configure
//!          │                       │
//!      ┌───▼───┐                   │
//!      │Ingest │  ← decode, coerce │
//!      └───┬───┘                   │
//!          │                       │
//!   ┌──────▼───────────────────────▼──┐
//!   │     Registry & Selection        │
//!   └──┬──────────────┬───────────────┘
//!      │              │
//!  ┌───▼───┐      ┌───▼───┐
//!  │Trades │      │ Books │
//!  └───┬───┘      └───┬───┘
//!      │ selected     │ selected
//!  ┌───▼────┐     ┌───▼───┐
//!  │Candles │     │ Depth │
//!  └───┬────┘     └───┬───┘
//!      │              │
//!   ┌──▼──────────────▼──┐
//!   │     View sink      │
//!   └────────────────────┘
//! ```

pub mod candles;
pub mod config;
pub mod depth;
pub mod events;
pub mod ingestion;
pub mod metrics;
pub mod order_book;
pub mod registry;
pub mod runtime;
pub mod trades;
pub mod view;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
