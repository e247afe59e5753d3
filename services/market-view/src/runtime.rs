//! Serial command runtime
//!
//! Market messages, selection changes and parameter updates all travel
//! through one queue and are handled one at a time, so a recomputation
//! triggered by a control command always runs before any market event queued
//! after it. The loop owns the registry outright; nothing else mutates it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ParamUpdate};
use crate::ingestion::{Ingested, Ingester};
use crate::metrics::ServiceMetrics;
use crate::registry::MarketRegistry;
use crate::view::{ViewSink, ViewUpdate};

/// Capacity of the command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine is no longer running")]
    Closed,

    #[error("engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One unit of work for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A raw message from the transport.
    Inbound(String),
    /// Explicit selection change; no symbol means the exchange's first.
    Select {
        exchange_id: String,
        symbol: Option<String>,
    },
    /// Runtime parameter change.
    Configure(ParamUpdate),
}

/// Synchronous core of the runtime: decode, route, derive.
pub struct ViewEngine {
    registry: MarketRegistry,
    ingester: Ingester,
    metrics: Arc<ServiceMetrics>,
}

impl ViewEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_metrics(config, Arc::new(ServiceMetrics::new()))
    }

    pub fn with_metrics(config: EngineConfig, metrics: Arc<ServiceMetrics>) -> Self {
        let ingester = Ingester::new(config.coercion);
        Self {
            registry: MarketRegistry::new(config),
            ingester,
            metrics,
        }
    }

    /// Handle one command, returning the view to publish, if any.
    pub fn handle(&mut self, command: Command) -> Option<ViewUpdate> {
        let update = match command {
            Command::Inbound(raw) => self.handle_inbound(&raw),
            Command::Select {
                exchange_id,
                symbol,
            } => {
                self.metrics.record_selection_change();
                Some(self.registry.set_selection(&exchange_id, symbol.as_deref()))
            }
            Command::Configure(param) => self.handle_configure(param),
        };

        if let Some(update) = &update {
            self.metrics.record_recomputation();
            debug!(kind = update.kind(), "View recomputed");
        }
        update
    }

    /// Full view to publish at startup, when a market is already selected.
    pub fn startup_view(&mut self) -> Option<ViewUpdate> {
        self.registry.selection()?;
        self.metrics.record_recomputation();
        Some(ViewUpdate::Full(self.registry.current_view()))
    }

    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    fn handle_inbound(&mut self, raw: &str) -> Option<ViewUpdate> {
        match self.ingester.ingest(raw) {
            Ok(Ingested::Accepted(ingested)) => {
                self.metrics.record_accepted();
                let update = self.registry.observe(ingested.event);
                if matches!(update, Some(ViewUpdate::Full(_))) {
                    self.metrics.record_selection_change();
                }
                update
            }
            Ok(Ingested::Ignored) => {
                self.metrics.record_ignored();
                None
            }
            Err(_) => {
                self.metrics.record_rejected();
                None
            }
        }
    }

    fn handle_configure(&mut self, param: ParamUpdate) -> Option<ViewUpdate> {
        match self.registry.apply(param) {
            Ok(update) => {
                if let ParamUpdate::Coercion(mode) = param {
                    self.ingester.set_mode(mode);
                }
                self.metrics.record_config_change(true);
                Some(update)
            }
            Err(err) => {
                warn!(param = param.name(), error = %err, "Rejected parameter update");
                self.metrics.record_config_change(false);
                None
            }
        }
    }
}

/// Handle to a running engine task.
pub struct EngineHandle {
    sender: mpsc::Sender<Command>,
    task: JoinHandle<()>,
    metrics: Arc<ServiceMetrics>,
}

impl EngineHandle {
    /// A clone of the command sender.
    ///
    /// The engine keeps running until every sender is dropped.
    pub fn sender(&self) -> mpsc::Sender<Command> {
        self.sender.clone()
    }

    /// Queue a command, waiting for room if the queue is full.
    pub async fn submit(&self, command: Command) -> Result<(), EngineError> {
        self.sender.send(command).await.map_err(|_| EngineError::Closed)
    }

    /// Live counters.
    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    /// Close the queue, wait for every queued command to be handled and
    /// return the final counters.
    pub async fn shutdown(self) -> Result<BTreeMap<String, u64>, EngineError> {
        let Self {
            sender,
            task,
            metrics,
        } = self;
        drop(sender);
        task.await?;
        Ok(metrics.export())
    }
}

/// Spawn the engine loop on the current tokio runtime.
pub fn start_engine<S>(config: EngineConfig, mut sink: S) -> EngineHandle
where
    S: ViewSink + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Command>(COMMAND_QUEUE_CAPACITY);
    let metrics = Arc::new(ServiceMetrics::new());
    let mut engine = ViewEngine::with_metrics(config, Arc::clone(&metrics));

    let task = tokio::spawn(async move {
        info!("Market view engine started");

        if let Some(update) = engine.startup_view() {
            publish(&mut sink, update, engine.metrics());
        }

        while let Some(command) = rx.recv().await {
            if let Some(update) = engine.handle(command) {
                publish(&mut sink, update, engine.metrics());
            }
        }

        info!("Command channel closed, engine exiting");
    });

    EngineHandle {
        sender: tx,
        task,
        metrics,
    }
}

fn publish<S: ViewSink>(sink: &mut S, update: ViewUpdate, metrics: &ServiceMetrics) {
    let kind = update.kind();
    match sink.publish(update) {
        Ok(()) => metrics.record_publication(true),
        Err(err) => {
            warn!(kind, error = %err, "Failed to publish view");
            metrics.record_publication(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Selection;
    use types::ids::MarketKey;

    fn trade(exchange_id: &str, symbol: &str, ts: i64, price: &str) -> Command {
        Command::Inbound(format!(
            r#"{{"type":"trade","exchange_id":"{exchange_id}","symbol":"{symbol}",
                "payload":{{"side":"buy","price":"{price}","amount":"1","timestamp":{ts}}}}}"#
        ))
    }

    #[test]
    fn test_engine_counts_outcomes() {
        let mut engine = ViewEngine::new(EngineConfig::default());

        assert!(engine.handle(trade("binance", "BTC/USDT", 1_000, "10")).is_some());
        assert!(engine.handle(Command::Inbound("garbage".to_string())).is_none());
        assert!(engine
            .handle(Command::Inbound(r#"{"type":"ping"}"#.to_string()))
            .is_none());

        let exported = engine.metrics().export();
        assert_eq!(exported["events_accepted"], 1);
        assert_eq!(exported["events_rejected"], 1);
        assert_eq!(exported["events_ignored"], 1);
        assert_eq!(exported["selection_changes"], 1);
        assert_eq!(exported["recomputations"], 1);
    }

    #[test]
    fn test_select_command() {
        let mut engine = ViewEngine::new(EngineConfig::default());
        engine.handle(trade("binance", "BTC/USDT", 1_000, "10"));
        engine.handle(trade("okx", "ETH/USDT", 1_000, "3000"));

        let update = engine.handle(Command::Select {
            exchange_id: "okx".to_string(),
            symbol: None,
        });
        match update {
            Some(ViewUpdate::Full(view)) => {
                assert_eq!(
                    view.selection,
                    Some(Selection::from(&MarketKey::new("okx", "ETH/USDT")))
                );
                assert_eq!(view.candles.len(), 1);
            }
            other => panic!("expected full view, got {other:?}"),
        }
    }

    #[test]
    fn test_configure_coercion_switches_ingester() {
        let mut engine = ViewEngine::new(EngineConfig::default());
        let update = engine.handle(Command::Configure(ParamUpdate::Coercion(
            types::numeric::CoercionMode::Strict,
        )));
        assert!(update.is_some());

        // String prices are now rejected
        assert!(engine.handle(trade("binance", "BTC/USDT", 1_000, "10")).is_none());
        assert_eq!(engine.metrics().export()["events_rejected"], 1);
    }

    #[test]
    fn test_configure_rejection() {
        let mut engine = ViewEngine::new(EngineConfig::default());
        assert!(engine
            .handle(Command::Configure(ParamUpdate::CandleCount(0)))
            .is_none());

        let exported = engine.metrics().export();
        assert_eq!(exported["config_rejections"], 1);
        assert_eq!(exported["config_changes"], 0);
    }

    #[test]
    fn test_startup_view_requires_selection() {
        let mut engine = ViewEngine::new(EngineConfig::default());
        assert!(engine.startup_view().is_none());

        let mut engine = ViewEngine::new(EngineConfig {
            default_market: Some(MarketKey::new("binance", "BTC/USDT")),
            ..EngineConfig::default()
        });
        assert!(matches!(engine.startup_view(), Some(ViewUpdate::Full(_))));
    }

    #[tokio::test]
    async fn test_engine_loop_publishes_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = start_engine(EngineConfig::default(), tx);

        handle.submit(trade("binance", "BTC/USDT", 1_000, "10")).await.unwrap();
        handle.submit(trade("binance", "BTC/USDT", 1_500, "12")).await.unwrap();
        handle
            .submit(Command::Configure(ParamUpdate::Timeframe(1)))
            .await
            .unwrap();

        let counters = handle.shutdown().await.unwrap();
        assert_eq!(counters["events_accepted"], 2);
        assert_eq!(counters["publications"], 3);

        let kinds: Vec<&str> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|update| update.kind())
            .collect();
        assert_eq!(kinds, vec!["full", "candles", "full"]);
    }
}
