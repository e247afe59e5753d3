//! Market view demo binary
//!
//! Plays both collaborators of the engine over standard streams:
//! - reads inbound transport messages, one JSON object per line, from stdin
//! - writes every published view as one JSON line to stdout
//!
//! Besides transport messages, stdin accepts two control lines:
//! - `{"type":"select","exchange_id":"okx","symbol":"ETH/USDT"}`
//! - `{"type":"configure","update":{"param":"timeframe","value":5}}`
//!
//! Lines that are not valid UTF-8 are dropped. Logs go to stderr and are
//! filtered with `RUST_LOG`.
//!
//! Usage:
//!   market-view --timeframe-secs 5 --candles 40 < events.jsonl

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use market_view::config::{EngineConfig, ParamUpdate};
use market_view::runtime::{start_engine, Command, EngineHandle};
use market_view::view::JsonLinesSink;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use types::ids::MarketKey;
use types::numeric::CoercionMode;

#[derive(Parser, Debug)]
#[command(name = "market-view")]
#[command(about = "Aggregate a market event stream into candle and depth views")]
struct Cli {
    /// JSON file with engine settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Candle timeframe in seconds
    #[arg(long)]
    timeframe_secs: Option<u64>,

    /// Number of candles published
    #[arg(long)]
    candles: Option<usize>,

    /// Trades retained per market
    #[arg(long)]
    trade_bound: Option<usize>,

    /// Levels per side in depth curves
    #[arg(long)]
    depth_levels: Option<usize>,

    /// Accept only JSON numbers in numeric fields
    #[arg(long)]
    strict: bool,

    /// Market selected at startup, as EXCHANGE:SYMBOL
    #[arg(long)]
    default_market: Option<String>,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                EngineConfig::from_json_str(&raw)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => EngineConfig::default(),
        };

        if let Some(secs) = self.timeframe_secs {
            config.timeframe_secs = secs;
        }
        if let Some(count) = self.candles {
            config.candle_count = count;
        }
        if let Some(bound) = self.trade_bound {
            config.trade_buffer_bound = bound;
        }
        if let Some(levels) = self.depth_levels {
            config.depth_levels = levels;
        }
        if self.strict {
            config.coercion = CoercionMode::Strict;
        }
        if let Some(market) = &self.default_market {
            config.default_market =
                Some(MarketKey::parse(market).context("invalid --default-market")?);
        }

        config.validate().context("invalid engine settings")?;
        Ok(config)
    }
}

/// Control commands accepted on stdin alongside transport messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ControlLine {
    Select {
        exchange_id: String,
        #[serde(default)]
        symbol: Option<String>,
    },
    Configure {
        update: ParamUpdate,
    },
}

fn command_for_line(line: String) -> Command {
    match serde_json::from_str::<ControlLine>(&line) {
        Ok(ControlLine::Select {
            exchange_id,
            symbol,
        }) => Command::Select {
            exchange_id,
            symbol,
        },
        Ok(ControlLine::Configure { update }) => Command::Configure(update),
        Err(_) => Command::Inbound(line),
    }
}

/// Forward every line of `reader` to the engine.
/// Returns the number of lines dropped as undecodable.
async fn forward_lines<R>(reader: R, handle: &EngineHandle) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut dropped = 0;
    let mut segments = reader.split(b'\n');
    while let Some(raw) = segments.next_segment().await.context("failed to read stdin")? {
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(err) => {
                dropped += 1;
                debug!(error = %err, "Dropping line that is not UTF-8");
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        handle.submit(command_for_line(line.to_string())).await?;
    }
    Ok(dropped)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("market_view=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config()?;

    let handle = start_engine(config, JsonLinesSink::new(std::io::stdout()));

    let dropped = forward_lines(BufReader::new(tokio::io::stdin()), &handle).await?;

    let counters = handle.shutdown().await?;
    info!(
        dropped_lines = dropped,
        counters = %serde_json::to_string(&counters)?,
        "Input exhausted"
    );
    Ok(())
}
