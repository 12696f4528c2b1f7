//! Edge-triggered trend-following engine.

use indicators::{Ema, Rsi};
use model::SyntheticBar;
use strategy_core::{
    Direction, Evaluation, IndicatorSnapshot, Signal, SignalEngine, SignalReason, StrategyError,
    TrendSnapshot,
};
use tracing::debug;

/// Configuration for the [`TrendEngine`].
#[derive(Debug, Clone)]
pub struct TrendConfig {
    pub ema_fast_len: usize,
    pub ema_mid_len: usize,
    pub ema_slow_len: usize,
    pub rsi_length: usize,
    /// RSI must exceed this for a long trigger.
    pub rsi_min_long: f64,
    /// RSI must be below this for a short trigger.
    pub rsi_max_short: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            ema_fast_len: 8,
            ema_mid_len: 21,
            ema_slow_len: 48,
            rsi_length: 14,
            rsi_min_long: 42.0,
            rsi_max_short: 58.0,
        }
    }
}

/// Triple-EMA stack with an RSI filter, firing exactly once per rising edge.
///
/// A long fires on the first bar where `ema_fast > ema_mid > ema_slow` and
/// `rsi > rsi_min_long` after a bar where that condition did not hold;
/// symmetric for shorts. At most one signal per bar.
pub struct TrendEngine {
    config: TrendConfig,
    ema_fast: Ema,
    ema_mid: Ema,
    ema_slow: Ema,
    rsi: Rsi,
    prev_long_look: bool,
    prev_short_look: bool,
}

impl TrendEngine {
    pub fn new(config: TrendConfig) -> Result<Self, StrategyError> {
        if config.ema_fast_len >= config.ema_mid_len || config.ema_mid_len >= config.ema_slow_len {
            return Err(StrategyError::InvalidConfig(format!(
                "EMA lengths must be strictly increasing, got {}/{}/{}",
                config.ema_fast_len, config.ema_mid_len, config.ema_slow_len
            )));
        }

        Ok(Self {
            ema_fast: Ema::new(config.ema_fast_len)?,
            ema_mid: Ema::new(config.ema_mid_len)?,
            ema_slow: Ema::new(config.ema_slow_len)?,
            rsi: Rsi::new(config.rsi_length)?,
            config,
            prev_long_look: false,
            prev_short_look: false,
        })
    }
}

impl SignalEngine for TrendEngine {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn evaluate(&mut self, bar: &SyntheticBar) -> Evaluation {
        let close = bar.close_f64();

        let fast = self.ema_fast.update(close);
        let mid = self.ema_mid.update(close);
        let slow = self.ema_slow.update(close);
        let rsi = self.rsi.update(close);

        let bull_stack = fast > mid && mid > slow;
        let bear_stack = fast < mid && mid < slow;
        let long_look = bull_stack && rsi > self.config.rsi_min_long;
        let short_look = bear_stack && rsi < self.config.rsi_max_short;
        let long_trig = long_look && !self.prev_long_look;
        let short_trig = short_look && !self.prev_short_look;

        self.prev_long_look = long_look;
        self.prev_short_look = short_look;

        let trend = TrendSnapshot {
            bull_stack,
            bear_stack,
            long_look,
            short_look,
            long_trig,
            short_trig,
        };
        let snapshot = IndicatorSnapshot {
            ema_fast: Some(fast),
            ema_mid: Some(mid),
            ema_slow: Some(slow),
            rsi: self.rsi.value().ready(),
            adx: None,
        };

        if long_trig {
            debug!(close, fast, mid, slow, rsi, "trend long trigger");
            return Evaluation::signal(Signal::new(
                Direction::Long,
                SignalReason::LongTrigger,
                None,
                bar,
                snapshot,
                trend,
            ));
        }
        if short_trig {
            debug!(close, fast, mid, slow, rsi, "trend short trigger");
            return Evaluation::signal(Signal::new(
                Direction::Short,
                SignalReason::ShortTrigger,
                None,
                bar,
                snapshot,
                trend,
            ));
        }

        Evaluation::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn bar(close: Decimal, end_ms: i64) -> SyntheticBar {
        SyntheticBar {
            start_time_ms: end_ms - 30_000,
            end_time_ms: end_ms,
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1),
        }
    }

    fn engine() -> TrendEngine {
        TrendEngine::new(TrendConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_ema_ordering_rejected() {
        let config = TrendConfig {
            ema_fast_len: 21,
            ema_mid_len: 8,
            ..TrendConfig::default()
        };
        assert!(matches!(
            TrendEngine::new(config),
            Err(StrategyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_rsi_length_rejected() {
        let config = TrendConfig {
            rsi_length: 1,
            ..TrendConfig::default()
        };
        assert!(matches!(
            TrendEngine::new(config),
            Err(StrategyError::Indicator(_))
        ));
    }

    #[test]
    fn test_rising_closes_fire_exactly_one_long() {
        // Closes 100, 101, ..., 130 at 30 s spacing: the stack turns bullish
        // once and RSI saturates high, so exactly one long must fire.
        let mut engine = engine();
        let mut signals = Vec::new();

        for i in 0..=30 {
            let close = dec!(100) + Decimal::from(i);
            let evaluation = engine.evaluate(&bar(close, (i as i64 + 1) * 30_000));
            assert!(evaluation.exit.is_none());
            if let Some(signal) = evaluation.signal {
                signals.push(signal);
            }
        }

        assert_eq!(signals.len(), 1, "expected exactly one long trigger");
        let signal = &signals[0];
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.reason, SignalReason::LongTrigger);
        assert!(signal.trend.bull_stack);
        assert!(signal.trend.long_trig);
        assert!(signal.indicators.ema_fast.unwrap() > signal.indicators.ema_mid.unwrap());
    }

    #[test]
    fn test_long_only_when_stack_and_rsi_hold() {
        let mut engine = engine();
        let mut fired = None;

        for i in 0..=30 {
            let close = dec!(100) + Decimal::from(i);
            if let Some(signal) = engine.evaluate(&bar(close, (i as i64 + 1) * 30_000)).signal {
                fired = Some(signal);
                break;
            }
        }

        let signal = fired.expect("a long should fire on a monotonic rise");
        let ind = signal.indicators;
        assert!(ind.ema_fast.unwrap() > ind.ema_mid.unwrap());
        assert!(ind.ema_mid.unwrap() > ind.ema_slow.unwrap());
        if let Some(rsi) = ind.rsi {
            assert!(rsi > 42.0);
        }
    }

    #[test]
    fn test_short_edge_after_reversal() {
        let mut engine = engine();
        let mut ts = 0;
        let mut shorts = 0;

        // Rise to build a bull stack, then fall hard to flip it.
        for i in 0..40 {
            ts += 30_000;
            engine.evaluate(&bar(dec!(100) + Decimal::from(i), ts));
        }
        for i in 0..60 {
            ts += 30_000;
            let close = dec!(139) - Decimal::from(i * 2);
            if let Some(signal) = engine.evaluate(&bar(close, ts)).signal {
                assert_eq!(signal.direction, Direction::Short);
                assert_eq!(signal.reason, SignalReason::ShortTrigger);
                shorts += 1;
            }
        }

        assert_eq!(shorts, 1, "a sustained fall should fire exactly one short");
    }

    #[test]
    fn test_edge_rearms_after_look_drops() {
        let mut engine = engine();
        let mut ts = 0;
        let mut longs = 0;

        let feed = |engine: &mut TrendEngine, closes: &[i64], ts: &mut i64| {
            let mut fired = 0;
            for &c in closes {
                *ts += 30_000;
                if engine.evaluate(&bar(Decimal::from(c), *ts)).signal.is_some() {
                    fired += 1;
                }
            }
            fired
        };

        // First rise: one long.
        let rise: Vec<i64> = (100..140).collect();
        longs += feed(&mut engine, &rise, &mut ts);
        // Deep fall breaks the bull stack (and may fire a short).
        let fall: Vec<i64> = (0..40).map(|i| 139 - i * 2).collect();
        feed(&mut engine, &fall, &mut ts);
        // Second rise: the long edge must re-arm and fire again.
        let rise2: Vec<i64> = (60..140).collect();
        longs += feed(&mut engine, &rise2, &mut ts);

        assert_eq!(longs, 2);
    }
}
