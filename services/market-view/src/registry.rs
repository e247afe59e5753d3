//! Market registry and selection manager
//!
//! Owns every piece of per-market state: the catalog of known exchanges and
//! symbols, the trade buffers, the latest book snapshots and the active
//! selection. Events are routed into the stores here, and only events for
//! the selected market trigger aggregation; an unselected market costs a
//! catalog lookup and a store write.
//!
//! Selection rules:
//! - with no selection, the first catalog exchange (insertion order) that
//!   has a symbol is selected together with its first symbol
//! - a configured default market takes precedence and is selected at startup
//! - a selection naming an exchange but no symbol adopts the first symbol
//!   registered for that exchange later on

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::ids::MarketKey;

use crate::candles::{aggregate, Candle};
use crate::config::{ConfigError, EngineConfig, ParamUpdate};
use crate::depth::DepthView;
use crate::events::{CatalogAnnouncement, MarketEvent};
use crate::order_book::OrderBookStore;
use crate::trades::TradeBufferStore;
use crate::view::{MarketView, ViewUpdate};

/// The market currently being rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub exchange_id: String,
    /// `None` when the exchange has no known symbol yet.
    pub symbol: Option<String>,
}

impl Selection {
    /// The selected market, if a symbol is chosen.
    pub fn market(&self) -> Option<MarketKey> {
        let symbol = self.symbol.as_deref()?;
        MarketKey::try_new(self.exchange_id.as_str(), symbol).ok()
    }

    /// Whether `key` is the selected market.
    pub fn is(&self, key: &MarketKey) -> bool {
        self.symbol
            .as_deref()
            .is_some_and(|symbol| key.matches(&self.exchange_id, symbol))
    }
}

impl From<&MarketKey> for Selection {
    fn from(key: &MarketKey) -> Self {
        Self {
            exchange_id: key.exchange_id().to_string(),
            symbol: Some(key.symbol().to_string()),
        }
    }
}

/// Known exchanges and their symbols, both in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exchanges: IndexMap<String, IndexSet<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market. Returns `true` if it was not known yet.
    pub fn register(&mut self, key: &MarketKey) -> bool {
        self.exchanges
            .entry(key.exchange_id().to_string())
            .or_default()
            .insert(key.symbol().to_string())
    }

    /// Register every exchange and symbol of a catalog seed.
    /// Returns the number of newly known markets.
    pub fn merge(&mut self, announcement: &CatalogAnnouncement) -> usize {
        let mut added = 0;
        for (exchange_id, symbols) in announcement {
            let known = self.exchanges.entry(exchange_id.clone()).or_default();
            for symbol in symbols {
                if known.insert(symbol.clone()) {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn contains(&self, key: &MarketKey) -> bool {
        self.exchanges
            .get(key.exchange_id())
            .is_some_and(|symbols| symbols.contains(key.symbol()))
    }

    /// Exchange ids in first-seen order.
    pub fn exchanges(&self) -> impl Iterator<Item = &str> + '_ {
        self.exchanges.keys().map(String::as_str)
    }

    /// Symbols of one exchange in first-seen order.
    pub fn symbols(&self, exchange_id: &str) -> impl Iterator<Item = &str> + '_ {
        self.exchanges
            .get(exchange_id)
            .into_iter()
            .flat_map(|symbols| symbols.iter().map(String::as_str))
    }

    /// First known symbol of an exchange.
    pub fn first_symbol(&self, exchange_id: &str) -> Option<&str> {
        self.symbols(exchange_id).next()
    }

    /// First exchange with at least one symbol, with that symbol.
    pub fn first_market(&self) -> Option<MarketKey> {
        self.exchanges.iter().find_map(|(exchange_id, symbols)| {
            let symbol = symbols.first()?;
            MarketKey::try_new(exchange_id.as_str(), symbol.as_str()).ok()
        })
    }

    /// Total number of known markets.
    pub fn market_count(&self) -> usize {
        self.exchanges.values().map(IndexSet::len).sum()
    }
}

/// Which store an event went to.
enum Stored {
    Trade(MarketKey),
    Book(MarketKey),
}

/// Routes events into per-market stores and derives views for the selection.
#[derive(Debug)]
pub struct MarketRegistry {
    config: EngineConfig,
    catalog: Catalog,
    trades: TradeBufferStore,
    books: OrderBookStore,
    selection: Option<Selection>,
}

impl MarketRegistry {
    /// Create a registry. A configured default market is registered and
    /// selected immediately.
    pub fn new(config: EngineConfig) -> Self {
        let mut catalog = Catalog::new();
        let selection = config.default_market.as_ref().map(|key| {
            catalog.register(key);
            Selection::from(key)
        });

        info!(
            timeframe_secs = config.timeframe_secs,
            candle_count = config.candle_count,
            trade_buffer_bound = config.trade_buffer_bound,
            depth_levels = config.depth_levels,
            default_market = ?config.default_market,
            "MarketRegistry initialized"
        );

        Self {
            trades: TradeBufferStore::new(config.trade_buffer_bound),
            books: OrderBookStore::new(),
            config,
            catalog,
            selection,
        }
    }

    /// Apply one event: register its market, store it, and return the view
    /// to publish if the selected market was affected.
    pub fn observe(&mut self, event: MarketEvent) -> Option<ViewUpdate> {
        if let MarketEvent::Catalog(announcement) = &event {
            let added = self.catalog.merge(announcement);
            debug!(added, exchanges = announcement.len(), "Catalog seeded");
        }
        if let Some(key) = event.market() {
            if self.catalog.register(key) {
                debug!(market = %key, "New market registered");
            }
        }

        let selection_changed = self.settle_selection();

        let stored = match event {
            MarketEvent::Catalog(_) => None,
            MarketEvent::Trade(trade) => {
                let market = trade.market.clone();
                self.trades.append(&market, trade);
                Some(Stored::Trade(market))
            }
            MarketEvent::OrderBook(book) => {
                let market = book.market.clone();
                self.books.put(&market, book);
                Some(Stored::Book(market))
            }
        };

        if selection_changed {
            return Some(ViewUpdate::Full(self.current_view()));
        }

        match stored {
            Some(Stored::Trade(market)) if self.is_selected(&market) => {
                Some(self.candles_update(market))
            }
            Some(Stored::Book(market)) if self.is_selected(&market) => {
                Some(self.depth_update(market))
            }
            _ => None,
        }
    }

    /// Explicitly change the selection and republish everything.
    ///
    /// Without a symbol, the first known symbol of the exchange is chosen;
    /// an exchange with no symbols yields an empty view.
    pub fn set_selection(&mut self, exchange_id: &str, symbol: Option<&str>) -> ViewUpdate {
        let symbol = symbol
            .map(str::to_string)
            .or_else(|| self.catalog.first_symbol(exchange_id).map(str::to_string));

        let selection = Selection {
            exchange_id: exchange_id.to_string(),
            symbol,
        };
        info!(
            exchange_id = %selection.exchange_id,
            symbol = ?selection.symbol,
            "Selection changed"
        );
        self.selection = Some(selection);

        ViewUpdate::Full(self.current_view())
    }

    /// Apply a parameter change and republish everything.
    ///
    /// An invalid value is rejected and nothing changes.
    pub fn apply(&mut self, update: ParamUpdate) -> Result<ViewUpdate, ConfigError> {
        self.config.apply(&update)?;
        if let ParamUpdate::TradeBufferBound(bound) = update {
            self.trades.set_bound(bound);
        }
        info!(param = update.name(), ?update, "Parameter updated");
        Ok(ViewUpdate::Full(self.current_view()))
    }

    /// Full derived view of the current selection.
    pub fn current_view(&self) -> MarketView {
        let market = self.selection.as_ref().and_then(Selection::market);
        let Some(key) = market else {
            return MarketView {
                selection: self.selection.clone(),
                ..MarketView::default()
            };
        };

        MarketView {
            selection: self.selection.clone(),
            candles: self.candles(&key),
            depth: self.depth(&key),
            latest_trade: self.trades.latest(&key).map(|trade| trade.describe()),
            top_of_book: self.books.get(&key).map(|book| book.describe_top()),
        }
    }

    /// Candle series for any market under the current parameters.
    pub fn candles(&self, key: &MarketKey) -> Vec<Candle> {
        aggregate(
            self.trades.iter(key),
            self.config.timeframe_ms(),
            self.config.candle_count,
        )
    }

    /// Depth curves for any market under the current parameters.
    pub fn depth(&self, key: &MarketKey) -> DepthView {
        DepthView::from_snapshot(self.books.get(key), self.config.depth_levels)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn trades(&self) -> &TradeBufferStore {
        &self.trades
    }

    pub fn books(&self) -> &OrderBookStore {
        &self.books
    }

    /// Fill in a missing selection or symbol from the catalog.
    /// Returns `true` if the selection changed.
    fn settle_selection(&mut self) -> bool {
        let Some(selection) = &self.selection else {
            let Some(key) = self.catalog.first_market() else {
                return false;
            };
            info!(market = %key, "Default selection");
            self.selection = Some(Selection::from(&key));
            return true;
        };
        if selection.symbol.is_some() {
            return false;
        }

        let Some(symbol) = self
            .catalog
            .first_symbol(&selection.exchange_id)
            .map(str::to_string)
        else {
            return false;
        };
        info!(exchange_id = %selection.exchange_id, %symbol, "Selection adopted symbol");
        self.selection = Some(Selection {
            exchange_id: selection.exchange_id.clone(),
            symbol: Some(symbol),
        });
        true
    }

    fn is_selected(&self, key: &MarketKey) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|selection| selection.is(key))
    }

    fn candles_update(&self, key: MarketKey) -> ViewUpdate {
        let candles = self.candles(&key);
        let latest_trade = self.trades.latest(&key).map(|trade| trade.describe());
        ViewUpdate::Candles {
            market: key,
            candles,
            latest_trade,
        }
    }

    fn depth_update(&self, key: MarketKey) -> ViewUpdate {
        let depth = self.depth(&key);
        let top_of_book = self.books.get(&key).map(|book| book.describe_top());
        ViewUpdate::Depth {
            market: key,
            depth,
            top_of_book,
        }
    }
}
