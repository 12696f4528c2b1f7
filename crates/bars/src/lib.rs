//! Fixed-duration OHLCV bar aggregation from trade ticks.

use model::{SyntheticBar, Tick};

/// Aggregates a tick stream into fixed-duration [`SyntheticBar`]s.
///
/// The builder exclusively owns the open bar; closed bars are handed out by
/// value and never touched again. A tick landing exactly on
/// `start_time + timeframe` closes the open bar and opens the next one (the
/// boundary tick belongs to the new bar). Backward timestamps are folded
/// into the current bar; the close always takes the latest tick.
#[derive(Debug)]
pub struct BarBuilder {
    timeframe_ms: i64,
    current: Option<SyntheticBar>,
}

impl BarBuilder {
    /// Create a builder for `timeframe_ms`-wide bars.
    ///
    /// # Panics
    /// Panics when `timeframe_ms` is not positive.
    pub fn new(timeframe_ms: i64) -> Self {
        assert!(timeframe_ms > 0, "bar timeframe must be positive");
        Self {
            timeframe_ms,
            current: None,
        }
    }

    pub fn timeframe_ms(&self) -> i64 {
        self.timeframe_ms
    }

    /// The open bar, if any tick has been seen since the last close.
    pub fn current(&self) -> Option<&SyntheticBar> {
        self.current.as_ref()
    }

    /// Feed one tick; returns the completed bar when this tick closed one.
    pub fn push_tick(&mut self, tick: &Tick) -> Option<SyntheticBar> {
        let Some(bar) = self.current.as_mut() else {
            self.current = Some(SyntheticBar::from_tick(tick));
            return None;
        };

        if tick.timestamp_ms - bar.start_time_ms >= self.timeframe_ms {
            self.current.replace(SyntheticBar::from_tick(tick))
        } else {
            bar.apply_tick(tick);
            None
        }
    }
}
