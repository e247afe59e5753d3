//! Engine configuration
//!
//! All parameters are runtime-mutable: the engine starts from an
//! `EngineConfig` and later receives `ParamUpdate`s through the same serial
//! queue as market events. An update that fails validation is rejected and
//! leaves the previous configuration in force.

use serde::{Deserialize, Serialize};
use types::errors::MarketKeyError;
use types::ids::MarketKey;
use types::numeric::CoercionMode;

use crate::depth::DEFAULT_DEPTH_LEVELS;
use crate::trades::DEFAULT_TRADE_BOUND;

/// Default candle timeframe in seconds.
pub const DEFAULT_TIMEFRAME_SECS: u64 = 60;

/// Default number of candles published.
pub const DEFAULT_CANDLE_COUNT: usize = 80;

/// Largest timeframe whose millisecond length still fits an `i64`.
const MAX_TIMEFRAME_SECS: u64 = (i64::MAX / 1000) as u64;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("timeframe of {0}s is too large")]
    TimeframeTooLarge(u64),

    #[error("invalid default market: {0}")]
    DefaultMarket(#[from] MarketKeyError),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Parameters of the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Candle timeframe in seconds.
    pub timeframe_secs: u64,
    /// Maximum number of candles published (most recent kept).
    pub candle_count: usize,
    /// Trades retained per market.
    pub trade_buffer_bound: usize,
    /// Levels per side included in depth curves.
    pub depth_levels: usize,
    /// Strictness of numeric coercion on inbound payloads.
    pub coercion: CoercionMode,
    /// Market selected at startup, overriding first-seen selection.
    pub default_market: Option<MarketKey>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeframe_secs: DEFAULT_TIMEFRAME_SECS,
            candle_count: DEFAULT_CANDLE_COUNT,
            trade_buffer_bound: DEFAULT_TRADE_BOUND,
            depth_levels: DEFAULT_DEPTH_LEVELS,
            coercion: CoercionMode::default(),
            default_market: None,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframe_secs == 0 {
            return Err(ConfigError::Zero {
                field: "timeframe_secs",
            });
        }
        if self.timeframe_secs > MAX_TIMEFRAME_SECS {
            return Err(ConfigError::TimeframeTooLarge(self.timeframe_secs));
        }
        if self.candle_count == 0 {
            return Err(ConfigError::Zero {
                field: "candle_count",
            });
        }
        if self.trade_buffer_bound == 0 {
            return Err(ConfigError::Zero {
                field: "trade_buffer_bound",
            });
        }
        if self.depth_levels == 0 {
            return Err(ConfigError::Zero {
                field: "depth_levels",
            });
        }
        if let Some(market) = &self.default_market {
            // Deserialization bypasses MarketKey::try_new
            MarketKey::try_new(market.exchange_id(), market.symbol())?;
        }
        Ok(())
    }

    /// Timeframe in milliseconds.
    pub fn timeframe_ms(&self) -> i64 {
        (self.timeframe_secs.min(MAX_TIMEFRAME_SECS) as i64) * 1000
    }

    /// Apply one parameter change. On error `self` is left untouched.
    pub fn apply(&mut self, update: &ParamUpdate) -> Result<(), ConfigError> {
        let mut next = self.clone();
        match *update {
            ParamUpdate::Timeframe(secs) => next.timeframe_secs = secs,
            ParamUpdate::CandleCount(count) => next.candle_count = count,
            ParamUpdate::TradeBufferBound(bound) => next.trade_buffer_bound = bound,
            ParamUpdate::DepthLevels(levels) => next.depth_levels = levels,
            ParamUpdate::Coercion(mode) => next.coercion = mode,
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// A single runtime parameter change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "param", content = "value", rename_all = "snake_case")]
pub enum ParamUpdate {
    /// Candle timeframe in seconds.
    Timeframe(u64),
    CandleCount(usize),
    TradeBufferBound(usize),
    DepthLevels(usize),
    Coercion(CoercionMode),
}

impl ParamUpdate {
    /// Parameter name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ParamUpdate::Timeframe(_) => "timeframe",
            ParamUpdate::CandleCount(_) => "candle_count",
            ParamUpdate::TradeBufferBound(_) => "trade_buffer_bound",
            ParamUpdate::DepthLevels(_) => "depth_levels",
            ParamUpdate::Coercion(_) => "coercion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timeframe_secs, 60);
        assert_eq!(config.candle_count, 80);
        assert_eq!(config.trade_buffer_bound, 100);
        assert_eq!(config.depth_levels, 20);
        assert_eq!(config.coercion, CoercionMode::Lenient);
        assert!(config.default_market.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.timeframe_ms(), 60_000);
    }

    #[test]
    fn test_parse_partial_json() {
        let config = EngineConfig::from_json_str(
            r#"{"timeframe_secs": 300, "coercion": "strict",
                "default_market": {"exchange_id": "okx", "symbol": "ETH/USDT"}}"#,
        )
        .unwrap();

        assert_eq!(config.timeframe_secs, 300);
        assert_eq!(config.candle_count, 80);
        assert_eq!(config.coercion, CoercionMode::Strict);
        assert_eq!(config.default_market, Some(MarketKey::new("okx", "ETH/USDT")));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"candle_count": 0}"#),
            Err(ConfigError::Zero { field: "candle_count" })
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(
                r#"{"default_market": {"exchange_id": " ", "symbol": "BTC/USDT"}}"#
            ),
            Err(ConfigError::DefaultMarket(_))
        ));
    }

    #[test]
    fn test_apply_valid_update() {
        let mut config = EngineConfig::default();
        config.apply(&ParamUpdate::Timeframe(5)).unwrap();
        config.apply(&ParamUpdate::DepthLevels(10)).unwrap();

        assert_eq!(config.timeframe_ms(), 5_000);
        assert_eq!(config.depth_levels, 10);
    }

    #[test]
    fn test_apply_invalid_update_keeps_previous() {
        let mut config = EngineConfig::default();
        let err = config.apply(&ParamUpdate::TradeBufferBound(0)).unwrap_err();

        assert_eq!(
            err,
            ConfigError::Zero {
                field: "trade_buffer_bound"
            }
        );
        assert_eq!(config, EngineConfig::default());

        assert!(matches!(
            config.apply(&ParamUpdate::Timeframe(u64::MAX)),
            Err(ConfigError::TimeframeTooLarge(_))
        ));
    }

    #[test]
    fn test_param_update_serde() {
        let update: ParamUpdate =
            serde_json::from_str(r#"{"param": "candle_count", "value": 40}"#).unwrap();
        assert_eq!(update, ParamUpdate::CandleCount(40));
        assert_eq!(update.name(), "candle_count");
    }
}
