//! Shared market-data types for the signal bot.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade tick from the exchange feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: Decimal,
    /// Traded quantity. Zero when the feed omits it.
    pub size: Decimal,
    pub timestamp_ms: i64,
}

/// Events delivered by the market-data connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    Tick(Tick),
}

/// Side of a position. `Flat` means no exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
    #[default]
    Flat,
}

impl PositionSide {
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }

    /// The opposite side. `Flat` stays `Flat`.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
            Self::Flat => Self::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Flat => "FLAT",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An OHLCV bar aggregated from ticks over a fixed time window.
///
/// While a bar is open it is owned and mutated by the bar builder; once
/// emitted as closed it is immutable. Invariants on a closed bar:
/// `low <= open, close <= high`, `volume >= 0`, `start_time_ms <= end_time_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBar {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl SyntheticBar {
    /// Seed a bar from its first tick.
    pub fn from_tick(tick: &Tick) -> Self {
        Self {
            start_time_ms: tick.timestamp_ms,
            end_time_ms: tick.timestamp_ms,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.size,
        }
    }

    /// Fold a tick into the open bar.
    pub fn apply_tick(&mut self, tick: &Tick) {
        if tick.price > self.high {
            self.high = tick.price;
        }
        if tick.price < self.low {
            self.low = tick.price;
        }
        self.close = tick.price;
        self.volume += tick.size;
        self.end_time_ms = tick.timestamp_ms;
    }

    /// Close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or_default()
    }

    pub fn high_f64(&self) -> f64 {
        self.high.to_f64().unwrap_or_default()
    }

    pub fn low_f64(&self) -> f64 {
        self.low.to_f64().unwrap_or_default()
    }

    pub fn open_f64(&self) -> f64 {
        self.open.to_f64().unwrap_or_default()
    }

    pub fn volume_f64(&self) -> f64 {
        self.volume.to_f64().unwrap_or_default()
    }
}
