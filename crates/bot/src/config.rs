//! Bot configuration, loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategies::{HybridConfig, TrendConfig};
use thiserror::Error;

/// Bars to swallow after startup before any trading decision.
pub const WARMUP_BARS: u64 = 10;

/// Minimum bars a position is held before a flip is allowed.
pub const MIN_HOLD_BARS: u64 = 6;

/// How long trading freezes after repeated reconciliation failures.
pub const FREEZE_DURATION_MS: i64 = 60_000;

/// Bound on the processed-signal dedup set (FIFO eviction).
pub const MAX_PROCESSED_SIGNALS: usize = 100;

/// Which strategy engine drives the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Trend,
    Hybrid,
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trend" => Ok(Self::Trend),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ConfigError::Invalid {
                name: "SIGNAL_BOT_STRATEGY",
                message: format!("unknown strategy '{other}', expected 'trend' or 'hybrid'"),
            }),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trend => write!(f, "trend"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Configuration errors; fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {message}")]
    Invalid {
        name: &'static str,
        message: String,
    },

    #[error("cannot parse {name}='{value}'")]
    Parse { name: &'static str, value: String },
}

/// Full bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub symbol: String,
    pub strategy: StrategyKind,
    /// Width of a synthetic bar.
    pub timeframe_ms: i64,
    pub trend: TrendConfig,
    pub hybrid: HybridConfig,

    // Risk envelope
    /// Order size when no dynamic sizing is configured; also the cap for
    /// dynamic sizing.
    pub max_position_size: Decimal,
    pub max_leverage: u32,
    pub max_flips_per_hour: usize,
    pub use_stop_loss: bool,
    /// Regular stop-loss distance in percent (active with `use_stop_loss`).
    pub stop_loss_pct: Decimal,
    /// Take-profit distance in percent; zero disables.
    pub take_profit_pct: Decimal,
    /// Emergency stop distance in percent; always armed for hybrid.
    pub emergency_stop_pct: Decimal,
    /// Percent of balance per position; `None` = fixed sizing.
    pub position_size_pct: Option<Decimal>,
    pub require_trending_market: bool,
    pub adx_threshold: f64,

    /// `false` = dry-run (no balance check, recording executor).
    pub live_trading: bool,
    pub poll_interval_ms: u64,
    pub warm_state_path: Option<PathBuf>,
    pub trade_log_path: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            strategy: StrategyKind::Hybrid,
            timeframe_ms: 30_000,
            trend: TrendConfig::default(),
            hybrid: HybridConfig::default(),
            max_position_size: dec!(100),
            max_leverage: 10,
            max_flips_per_hour: 4,
            use_stop_loss: false,
            stop_loss_pct: dec!(1.0),
            take_profit_pct: dec!(2.0),
            emergency_stop_pct: dec!(3.0),
            position_size_pct: None,
            require_trending_market: false,
            adx_threshold: 25.0,
            live_trading: false,
            poll_interval_ms: 2_000,
            warm_state_path: Some(PathBuf::from("warm-state.json")),
            trade_log_path: Some(PathBuf::from("trades.csv")),
        }
    }
}

impl BotConfig {
    /// Load configuration from `SIGNAL_BOT_*` environment variables on top
    /// of the defaults.
    ///
    /// # Errors
    /// Any unparseable or out-of-range value is fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(symbol) = read_env("SIGNAL_BOT_SYMBOL") {
            config.symbol = symbol.to_uppercase();
        }
        if let Some(strategy) = read_env("SIGNAL_BOT_STRATEGY") {
            config.strategy = strategy.parse()?;
        }
        if let Some(mode) = read_env("SIGNAL_BOT_MODE") {
            config.live_trading = match mode.to_lowercase().as_str() {
                "live" => true,
                "dry-run" | "dryrun" | "paper" => false,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "SIGNAL_BOT_MODE",
                        message: format!("unknown mode '{other}', expected 'live' or 'dry-run'"),
                    })
                }
            };
        }

        parse_into(&mut config.timeframe_ms, "SIGNAL_BOT_TIMEFRAME_MS")?;
        parse_into(&mut config.max_position_size, "SIGNAL_BOT_MAX_POSITION_SIZE")?;
        parse_into(&mut config.max_leverage, "SIGNAL_BOT_MAX_LEVERAGE")?;
        parse_into(&mut config.max_flips_per_hour, "SIGNAL_BOT_MAX_FLIPS_PER_HOUR")?;
        parse_into(&mut config.use_stop_loss, "SIGNAL_BOT_USE_STOP_LOSS")?;
        parse_into(&mut config.stop_loss_pct, "SIGNAL_BOT_STOP_LOSS_PCT")?;
        parse_into(&mut config.take_profit_pct, "SIGNAL_BOT_TAKE_PROFIT_PCT")?;
        parse_into(&mut config.emergency_stop_pct, "SIGNAL_BOT_EMERGENCY_STOP_PCT")?;
        parse_into(
            &mut config.require_trending_market,
            "SIGNAL_BOT_REQUIRE_TRENDING_MARKET",
        )?;
        parse_into(&mut config.adx_threshold, "SIGNAL_BOT_ADX_THRESHOLD")?;
        parse_into(&mut config.poll_interval_ms, "SIGNAL_BOT_POLL_INTERVAL_MS")?;

        if let Some(pct) = parse_env::<Decimal>("SIGNAL_BOT_POSITION_SIZE_PCT")? {
            config.position_size_pct = Some(pct);
        }
        if let Some(path) = read_env("SIGNAL_BOT_STATE_PATH") {
            config.warm_state_path = Some(PathBuf::from(path));
        }
        if let Some(path) = read_env("SIGNAL_BOT_TRADE_LOG") {
            config.trade_log_path = Some(PathBuf::from(path));
        }

        // Indicator lengths and thresholds shared by the trend engine and
        // the hybrid V1 system.
        parse_into(&mut config.trend.ema_fast_len, "SIGNAL_BOT_EMA_FAST")?;
        parse_into(&mut config.trend.ema_mid_len, "SIGNAL_BOT_EMA_MID")?;
        parse_into(&mut config.trend.ema_slow_len, "SIGNAL_BOT_EMA_SLOW")?;
        parse_into(&mut config.trend.rsi_length, "SIGNAL_BOT_RSI_LENGTH")?;
        parse_into(&mut config.trend.rsi_min_long, "SIGNAL_BOT_RSI_MIN_LONG")?;
        parse_into(&mut config.trend.rsi_max_short, "SIGNAL_BOT_RSI_MAX_SHORT")?;
        config.hybrid.v1_ema_fast_len = config.trend.ema_fast_len;
        config.hybrid.v1_ema_mid_len = config.trend.ema_mid_len;
        config.hybrid.v1_ema_slow_len = config.trend.ema_slow_len;
        config.hybrid.v1_rsi_length = config.trend.rsi_length;

        // Hybrid-specific knobs.
        parse_into(&mut config.hybrid.min_bars_between, "SIGNAL_BOT_MIN_BARS_BETWEEN")?;
        parse_into(&mut config.hybrid.min_move_percent, "SIGNAL_BOT_MIN_MOVE_PERCENT")?;
        parse_into(
            &mut config.hybrid.rsi_momentum_threshold,
            "SIGNAL_BOT_RSI_MOMENTUM_THRESHOLD",
        )?;
        parse_into(&mut config.hybrid.volume_lookback, "SIGNAL_BOT_VOLUME_LOOKBACK")?;
        parse_into(&mut config.hybrid.volume_multiplier, "SIGNAL_BOT_VOLUME_MULTIPLIER")?;
        parse_into(
            &mut config.hybrid.exit_volume_multiplier,
            "SIGNAL_BOT_EXIT_VOLUME_MULTIPLIER",
        )?;
        parse_into(&mut config.hybrid.adx_length, "SIGNAL_BOT_ADX_LENGTH")?;

        config.validate()?;
        Ok(config)
    }

    /// Range checks over the whole config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframe_ms <= 0 {
            return Err(invalid("SIGNAL_BOT_TIMEFRAME_MS", "must be positive"));
        }
        if self.max_position_size <= Decimal::ZERO {
            return Err(invalid("SIGNAL_BOT_MAX_POSITION_SIZE", "must be positive"));
        }
        if self.max_leverage == 0 || self.max_leverage > 125 {
            return Err(invalid("SIGNAL_BOT_MAX_LEVERAGE", "must be in 1..=125"));
        }
        if self.max_flips_per_hour == 0 {
            return Err(invalid("SIGNAL_BOT_MAX_FLIPS_PER_HOUR", "must be at least 1"));
        }
        if self.emergency_stop_pct <= Decimal::ZERO {
            return Err(invalid("SIGNAL_BOT_EMERGENCY_STOP_PCT", "must be positive"));
        }
        if self.stop_loss_pct < Decimal::ZERO || self.take_profit_pct < Decimal::ZERO {
            return Err(invalid("SIGNAL_BOT_STOP_LOSS_PCT", "must not be negative"));
        }
        if let Some(pct) = self.position_size_pct {
            if pct <= Decimal::ZERO || pct > dec!(100) {
                return Err(invalid("SIGNAL_BOT_POSITION_SIZE_PCT", "must be in (0, 100]"));
            }
        }
        if self.poll_interval_ms < 500 {
            return Err(invalid("SIGNAL_BOT_POLL_INTERVAL_MS", "must be at least 500"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        message: message.to_string(),
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match read_env(name) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Parse { name, value }),
    }
}

fn parse_into<T: FromStr>(slot: &mut T, name: &'static str) -> Result<(), ConfigError> {
    if let Some(value) = parse_env(name)? {
        *slot = value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BotConfig::default().validate().is_ok());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("trend".parse::<StrategyKind>().unwrap(), StrategyKind::Trend);
        assert_eq!(
            "HYBRID".parse::<StrategyKind>().unwrap(),
            StrategyKind::Hybrid
        );
        assert!("martingale".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = BotConfig::default();
        config.timeframe_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.max_leverage = 126;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.position_size_pct = Some(dec!(150));
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.max_flips_per_hour = 0;
        assert!(config.validate().is_err());
    }
}
