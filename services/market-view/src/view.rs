//! Published views and the sink seam
//!
//! Everything the rendering side ever sees is a `ViewUpdate`. Per-event
//! updates carry only the half of the view the event could have changed;
//! selection and parameter changes republish the whole view.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use types::ids::MarketKey;

use crate::candles::Candle;
use crate::depth::DepthView;
use crate::registry::Selection;

/// Sink errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("view receiver dropped")]
    Closed,

    #[error("failed to encode view: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write view: {0}")]
    Io(#[from] std::io::Error),
}

/// Complete derived view of the selected market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketView {
    /// `None` until any market is known.
    pub selection: Option<Selection>,
    pub candles: Vec<Candle>,
    pub depth: DepthView,
    /// Latest trade readout.
    pub latest_trade: Option<String>,
    /// Top-of-book readout.
    pub top_of_book: Option<String>,
}

impl MarketView {
    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty() && self.depth.is_empty()
    }
}

/// One publication to the rendering side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum ViewUpdate {
    /// A trade on the selected market changed the candle series.
    Candles {
        market: MarketKey,
        candles: Vec<Candle>,
        latest_trade: Option<String>,
    },

    /// A snapshot on the selected market changed the depth curves.
    Depth {
        market: MarketKey,
        depth: DepthView,
        top_of_book: Option<String>,
    },

    /// Selection or parameters changed; everything is republished.
    Full(MarketView),
}

impl ViewUpdate {
    /// Label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ViewUpdate::Candles { .. } => "candles",
            ViewUpdate::Depth { .. } => "depth",
            ViewUpdate::Full(_) => "full",
        }
    }
}

/// Receives every published view, in publication order.
pub trait ViewSink: Send {
    fn publish(&mut self, update: ViewUpdate) -> Result<(), SinkError>;
}

impl ViewSink for mpsc::UnboundedSender<ViewUpdate> {
    fn publish(&mut self, update: ViewUpdate) -> Result<(), SinkError> {
        self.send(update).map_err(|_| SinkError::Closed)
    }
}

/// Collects views in memory.
impl ViewSink for Vec<ViewUpdate> {
    fn publish(&mut self, update: ViewUpdate) -> Result<(), SinkError> {
        self.push(update);
        Ok(())
    }
}

/// Writes each view as one JSON line.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ViewSink for JsonLinesSink<W> {
    fn publish(&mut self, update: ViewUpdate) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &update)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
