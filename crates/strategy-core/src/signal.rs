//! Signal types emitted by strategy engines.

use model::SyntheticBar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of an entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which sub-system of a hybrid engine produced the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum System {
    V1,
    V2,
}

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalReason {
    LongTrigger,
    ShortTrigger,
    V1Long,
    V1Short,
    V2Long,
    V2Short,
}

impl SignalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongTrigger => "long-trigger",
            Self::ShortTrigger => "short-trigger",
            Self::V1Long => "v1-long",
            Self::V1Short => "v1-short",
            Self::V2Long => "v2-long",
            Self::V2Short => "v2-short",
        }
    }
}

impl std::fmt::Display for SignalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an engine recommends leaving the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// RSI moved against the position over the last three bars.
    RsiReversal,
    /// RSI momentum flattened while volume dried up.
    RsiFlatteningVolumeDrop,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsiReversal => "rsi-reversal",
            Self::RsiFlatteningVolumeDrop => "rsi-flattening-volume-drop",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator readings at signal time. `None` means "not yet warm".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema_fast: Option<f64>,
    pub ema_mid: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
}

/// Trend-state booleans at signal time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub bull_stack: bool,
    pub bear_stack: bool,
    pub long_look: bool,
    pub short_look: bool,
    pub long_trig: bool,
    pub short_trig: bool,
}

/// A directional entry signal for one closed bar.
///
/// Signals are ephemeral values; the orchestrator deduplicates them by
/// `(direction, bar end time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub reason: SignalReason,
    pub system: Option<System>,
    pub price: Decimal,
    pub bar_end_time_ms: i64,
    pub indicators: IndicatorSnapshot,
    pub trend: TrendSnapshot,
}

impl Signal {
    pub fn new(
        direction: Direction,
        reason: SignalReason,
        system: Option<System>,
        bar: &SyntheticBar,
        indicators: IndicatorSnapshot,
        trend: TrendSnapshot,
    ) -> Self {
        Self {
            direction,
            reason,
            system,
            price: bar.close,
            bar_end_time_ms: bar.end_time_ms,
            indicators,
            trend,
        }
    }

    /// Key used to suppress duplicate signals for the same bar.
    pub fn dedup_key(&self) -> String {
        format!("{}-{}", self.direction, self.bar_end_time_ms)
    }
}
