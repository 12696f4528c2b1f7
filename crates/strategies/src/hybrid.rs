//! Hybrid trend-bias + momentum-surge engine.

use std::collections::VecDeque;

use indicators::{Adx, Ema, Rsi};
use model::{PositionSide, SyntheticBar};
use strategy_core::{
    Direction, Evaluation, ExitReason, IndicatorSnapshot, Signal, SignalEngine, SignalReason,
    StrategyError, System, TrendSnapshot,
};
use tracing::debug;

/// RSI samples retained for the exit detector (momentum uses the last two,
/// the exit detector the full three).
const RSI_HISTORY_LEN: usize = 3;

/// RSI momentum below this counts as "flattening" for the exit detector.
const RSI_FLATTENING_THRESHOLD: f64 = 2.0;

/// Floor for the volume ring size.
const MIN_VOLUME_LOOKBACK: usize = 10;

/// Configuration for the [`HybridEngine`].
#[derive(Debug, Clone)]
pub struct HybridConfig {
    // V1 trend/bias system
    pub v1_ema_fast_len: usize,
    pub v1_ema_mid_len: usize,
    pub v1_ema_slow_len: usize,
    pub v1_ema_micro_fast_len: usize,
    pub v1_ema_micro_slow_len: usize,
    pub v1_rsi_length: usize,
    pub v1_rsi_min_long: f64,
    pub v1_rsi_max_short: f64,
    /// Bars that must pass between two V1 signals.
    pub min_bars_between: usize,
    /// Minimum absolute percent move from the last same-side entry price.
    pub min_move_percent: f64,

    // V2 momentum-surge system
    pub v2_ema_fast_len: usize,
    pub v2_ema_mid_len: usize,
    pub v2_ema_slow_len: usize,
    pub v2_rsi_length: usize,
    /// Minimum one-bar RSI change for a surge.
    pub rsi_momentum_threshold: f64,
    pub volume_lookback: usize,
    /// Volume must reach `avg * multiplier` to count as a spike.
    pub volume_multiplier: f64,

    /// Exit fires on flattening RSI when `volume / avg` drops below this.
    pub exit_volume_multiplier: f64,

    // Market-regime gate
    pub adx_length: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            v1_ema_fast_len: 8,
            v1_ema_mid_len: 21,
            v1_ema_slow_len: 48,
            v1_ema_micro_fast_len: 5,
            v1_ema_micro_slow_len: 13,
            v1_rsi_length: 14,
            v1_rsi_min_long: 52.0,
            v1_rsi_max_short: 48.0,
            min_bars_between: 3,
            min_move_percent: 0.1,
            v2_ema_fast_len: 3,
            v2_ema_mid_len: 8,
            v2_ema_slow_len: 21,
            v2_rsi_length: 7,
            rsi_momentum_threshold: 3.0,
            volume_lookback: 20,
            volume_multiplier: 1.5,
            exit_volume_multiplier: 1.2,
            adx_length: 14,
        }
    }
}

/// Two-system engine: V1 supplies the directional bias, V2 catches momentum
/// surges, and an RSI/volume detector recommends exits while a position is
/// open. V1 is always evaluated before V2 and at most one signal is emitted
/// per bar; when the exit detector fires, the bar's signal is discarded.
pub struct HybridEngine {
    config: HybridConfig,

    v1_ema_fast: Ema,
    v1_ema_mid: Ema,
    v1_ema_slow: Ema,
    v1_ema_micro_fast: Ema,
    v1_ema_micro_slow: Ema,
    v1_rsi: Rsi,
    prev_long_look: bool,
    prev_short_look: bool,
    bars_since_v1: Option<usize>,
    last_long_entry: Option<f64>,
    last_short_entry: Option<f64>,

    v2_ema_fast: Ema,
    v2_ema_mid: Ema,
    v2_ema_slow: Ema,
    v2_rsi: Rsi,
    rsi_history: VecDeque<f64>,
    volume_ring: VecDeque<f64>,
    volume_ring_cap: usize,

    adx: Adx,
    position_side: PositionSide,
}

impl HybridEngine {
    pub fn new(config: HybridConfig) -> Result<Self, StrategyError> {
        for (label, fast, mid, slow) in [
            (
                "V1",
                config.v1_ema_fast_len,
                config.v1_ema_mid_len,
                config.v1_ema_slow_len,
            ),
            (
                "V2",
                config.v2_ema_fast_len,
                config.v2_ema_mid_len,
                config.v2_ema_slow_len,
            ),
        ] {
            if fast >= mid || mid >= slow {
                return Err(StrategyError::InvalidConfig(format!(
                    "{label} EMA lengths must be strictly increasing, got {fast}/{mid}/{slow}"
                )));
            }
        }
        if config.v1_ema_micro_fast_len >= config.v1_ema_micro_slow_len {
            return Err(StrategyError::InvalidConfig(format!(
                "micro EMA pair must be increasing, got {}/{}",
                config.v1_ema_micro_fast_len, config.v1_ema_micro_slow_len
            )));
        }

        let volume_ring_cap = config.volume_lookback.max(MIN_VOLUME_LOOKBACK);

        Ok(Self {
            v1_ema_fast: Ema::new(config.v1_ema_fast_len)?,
            v1_ema_mid: Ema::new(config.v1_ema_mid_len)?,
            v1_ema_slow: Ema::new(config.v1_ema_slow_len)?,
            v1_ema_micro_fast: Ema::new(config.v1_ema_micro_fast_len)?,
            v1_ema_micro_slow: Ema::new(config.v1_ema_micro_slow_len)?,
            v1_rsi: Rsi::new(config.v1_rsi_length)?,
            prev_long_look: false,
            prev_short_look: false,
            bars_since_v1: None,
            last_long_entry: None,
            last_short_entry: None,
            v2_ema_fast: Ema::new(config.v2_ema_fast_len)?,
            v2_ema_mid: Ema::new(config.v2_ema_mid_len)?,
            v2_ema_slow: Ema::new(config.v2_ema_slow_len)?,
            v2_rsi: Rsi::new(config.v2_rsi_length)?,
            rsi_history: VecDeque::with_capacity(RSI_HISTORY_LEN + 1),
            volume_ring: VecDeque::with_capacity(volume_ring_cap + 1),
            volume_ring_cap,
            adx: Adx::new(config.adx_length)?,
            config,
            position_side: PositionSide::Flat,
        })
    }

    fn average_volume(&self) -> Option<f64> {
        if self.volume_ring.is_empty() {
            return None;
        }
        Some(self.volume_ring.iter().sum::<f64>() / self.volume_ring.len() as f64)
    }

    /// Min-bars and min-move filters on a V1 candidate.
    fn v1_filters_pass(&self, direction: Direction, close: f64) -> bool {
        if let Some(bars) = self.bars_since_v1 {
            if bars < self.config.min_bars_between {
                return false;
            }
        }

        let last_entry = match direction {
            Direction::Long => self.last_long_entry,
            Direction::Short => self.last_short_entry,
        };
        match last_entry {
            Some(entry) if entry > 0.0 => {
                let move_pct = ((close - entry).abs() / entry) * 100.0;
                move_pct >= self.config.min_move_percent
            }
            _ => true,
        }
    }

    /// Exit detector over the last three RSI samples and the volume ring.
    ///
    /// An adverse move needs real momentum against the position; when the
    /// RSI has flattened instead, the exit only fires together with a
    /// volume drop.
    fn check_exit(&self, volume: f64, avg_volume: Option<f64>) -> Option<ExitReason> {
        if self.rsi_history.len() < RSI_HISTORY_LEN {
            return None;
        }
        let rsi_last = *self.rsi_history.back()?;
        let rsi_oldest = *self.rsi_history.front()?;

        let momentum = (rsi_last - rsi_oldest).abs();
        let flattening = momentum < RSI_FLATTENING_THRESHOLD;

        let adverse = !flattening
            && match self.position_side {
                PositionSide::Long => rsi_last < rsi_oldest,
                PositionSide::Short => rsi_last > rsi_oldest,
                PositionSide::Flat => false,
            };
        if adverse {
            return Some(ExitReason::RsiReversal);
        }

        let avg = avg_volume?;
        if avg <= 0.0 {
            return None;
        }
        let volume_drop = volume / avg < self.config.exit_volume_multiplier;
        if flattening && volume_drop {
            return Some(ExitReason::RsiFlatteningVolumeDrop);
        }

        None
    }
}

impl SignalEngine for HybridEngine {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn evaluate(&mut self, bar: &SyntheticBar) -> Evaluation {
        let close = bar.close_f64();
        let volume = bar.volume_f64();

        let v1_fast = self.v1_ema_fast.update(close);
        let v1_mid = self.v1_ema_mid.update(close);
        let v1_slow = self.v1_ema_slow.update(close);
        let micro_fast = self.v1_ema_micro_fast.update(close);
        let micro_slow = self.v1_ema_micro_slow.update(close);
        let v1_rsi = self.v1_rsi.update(close);

        let v2_fast = self.v2_ema_fast.update(close);
        let v2_mid = self.v2_ema_mid.update(close);
        let v2_slow = self.v2_ema_slow.update(close);
        let v2_rsi = self.v2_rsi.update(close);
        self.adx.update(bar.high_f64(), bar.low_f64(), close);

        // Rolling windows: the average excludes the current bar.
        let avg_volume = self.average_volume();
        let prev_v2_rsi = self.rsi_history.back().copied();

        self.rsi_history.push_back(v2_rsi);
        if self.rsi_history.len() > RSI_HISTORY_LEN {
            self.rsi_history.pop_front();
        }
        self.volume_ring.push_back(volume);
        if self.volume_ring.len() > self.volume_ring_cap {
            self.volume_ring.pop_front();
        }
        if let Some(bars) = self.bars_since_v1.as_mut() {
            *bars += 1;
        }

        // Exit before entry: a firing exit discards this bar's signal.
        if !self.position_side.is_flat() {
            if let Some(reason) = self.check_exit(volume, avg_volume) {
                debug!(side = %self.position_side, %reason, "hybrid exit detector fired");
                return Evaluation::exit(reason);
            }
        }

        // V1: trend bias with micro confirmation and rate/move filters.
        let bull_stack = v1_fast > v1_mid && v1_mid > v1_slow;
        let bear_stack = v1_fast < v1_mid && v1_mid < v1_slow;
        let long_look =
            bull_stack && micro_fast > micro_slow && v1_rsi > self.config.v1_rsi_min_long;
        let short_look =
            bear_stack && micro_fast < micro_slow && v1_rsi < self.config.v1_rsi_max_short;
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

        let v1_direction = if long_look {
            Some((Direction::Long, SignalReason::V1Long))
        } else if short_look {
            Some((Direction::Short, SignalReason::V1Short))
        } else {
            None
        };

        if let Some((direction, reason)) = v1_direction {
            if self.v1_filters_pass(direction, close) {
                match direction {
                    Direction::Long => self.last_long_entry = Some(close),
                    Direction::Short => self.last_short_entry = Some(close),
                }
                self.bars_since_v1 = Some(0);

                debug!(%direction, close, v1_rsi, "hybrid V1 signal");
                return Evaluation::signal(Signal::new(
                    direction,
                    reason,
                    Some(System::V1),
                    bar,
                    IndicatorSnapshot {
                        ema_fast: Some(v1_fast),
                        ema_mid: Some(v1_mid),
                        ema_slow: Some(v1_slow),
                        rsi: self.v1_rsi.value().ready(),
                        adx: self.adx.value().ready(),
                    },
                    trend,
                ));
            }
        }

        // V2: momentum surge, only reached when V1 stayed quiet.
        if let (Some(prev_rsi), Some(avg)) = (prev_v2_rsi, avg_volume) {
            let rsi_momentum = v2_rsi - prev_rsi;
            let rsi_surge = rsi_momentum.abs() >= self.config.rsi_momentum_threshold;
            let volume_spike = avg > 0.0 && volume >= avg * self.config.volume_multiplier;
            let green = bar.is_bullish();
            let v2_bullish = v2_fast > v2_mid && v2_mid > v2_slow;
            let v2_bearish = v2_fast < v2_mid && v2_mid < v2_slow;

            let v2_direction = if rsi_surge && rsi_momentum > 0.0 && volume_spike && green && v2_bullish
            {
                Some((Direction::Long, SignalReason::V2Long))
            } else if rsi_surge && rsi_momentum < 0.0 && volume_spike && !green && v2_bearish {
                Some((Direction::Short, SignalReason::V2Short))
            } else {
                None
            };

            if let Some((direction, reason)) = v2_direction {
                debug!(%direction, rsi_momentum, volume, avg, "hybrid V2 surge");
                return Evaluation::signal(Signal::new(
                    direction,
                    reason,
                    Some(System::V2),
                    bar,
                    IndicatorSnapshot {
                        ema_fast: Some(v2_fast),
                        ema_mid: Some(v2_mid),
                        ema_slow: Some(v2_slow),
                        rsi: self.v2_rsi.value().ready(),
                        adx: self.adx.value().ready(),
                    },
                    trend,
                ));
            }
        }

        Evaluation::none()
    }

    fn position_changed(&mut self, side: PositionSide) {
        self.position_side = side;
    }

    fn regime_allows(&self, adx_threshold: f64) -> bool {
        !self.adx.is_ready() || self.adx.is_trending(adx_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, close: Decimal, volume: Decimal, end_ms: i64) -> SyntheticBar {
        SyntheticBar {
            start_time_ms: end_ms - 30_000,
            end_time_ms: end_ms,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume,
        }
    }

    /// Small lengths so tests warm up quickly; V1 RSI gates wide open.
    fn v1_config() -> HybridConfig {
        HybridConfig {
            v1_ema_fast_len: 2,
            v1_ema_mid_len: 3,
            v1_ema_slow_len: 5,
            v1_ema_micro_fast_len: 2,
            v1_ema_micro_slow_len: 3,
            v1_rsi_length: 2,
            v1_rsi_min_long: 0.0,
            v1_rsi_max_short: 100.0,
            min_bars_between: 1,
            min_move_percent: 0.1,
            ..HybridConfig::default()
        }
    }

    /// V1 can never fire (impossible RSI gates); V2 easy to reach.
    fn v2_only_config() -> HybridConfig {
        HybridConfig {
            v1_rsi_min_long: 101.0,
            v1_rsi_max_short: -1.0,
            v2_ema_fast_len: 2,
            v2_ema_mid_len: 3,
            v2_ema_slow_len: 5,
            v2_rsi_length: 2,
            rsi_momentum_threshold: 3.0,
            volume_lookback: 4,
            volume_multiplier: 1.5,
            ..HybridConfig::default()
        }
    }

    fn feed_rise(engine: &mut HybridEngine, bars: usize, start: f64, step: f64, volume: f64) {
        for i in 0..bars {
            let close = Decimal::from_f64(start + step * i as f64).unwrap();
            let open = close - Decimal::from_f64(step / 2.0).unwrap();
            engine.evaluate(&bar(
                open,
                close,
                Decimal::from_f64(volume).unwrap(),
                (i as i64 + 1) * 30_000,
            ));
        }
    }

    #[test]
    fn test_invalid_stacks_rejected() {
        let config = HybridConfig {
            v2_ema_fast_len: 21,
            v2_ema_mid_len: 8,
            ..HybridConfig::default()
        };
        assert!(matches!(
            HybridEngine::new(config),
            Err(StrategyError::InvalidConfig(_))
        ));

        let config = HybridConfig {
            v1_ema_micro_fast_len: 13,
            v1_ema_micro_slow_len: 5,
            ..HybridConfig::default()
        };
        assert!(HybridEngine::new(config).is_err());
    }

    #[test]
    fn test_v1_min_move_filter() {
        let mut engine = HybridEngine::new(v1_config()).unwrap();
        let mut ts = 0;
        let mut first = None;

        // Rise until the first V1 long fires and stamps its entry price.
        for i in 0..20 {
            ts += 30_000;
            let close = dec!(90) + Decimal::from(i);
            if let Some(signal) = engine.evaluate(&bar(close - dec!(1), close, dec!(1), ts)).signal {
                assert_eq!(signal.reason, SignalReason::V1Long);
                first = Some(signal);
                break;
            }
        }
        let first = first.expect("V1 long should fire on a steady rise");
        let entry = first.price;

        // 0.05 % above the stamped entry: look still holds, move filter blocks.
        ts += 30_000;
        let close = entry * dec!(1.0005);
        let evaluation = engine.evaluate(&bar(entry, close, dec!(1), ts));
        assert!(evaluation.signal.is_none(), "0.05% move must be suppressed");

        // 0.15 % above the stamped entry: passes the filter.
        ts += 30_000;
        let close = entry * dec!(1.0015);
        let evaluation = engine.evaluate(&bar(entry, close, dec!(1), ts));
        let signal = evaluation.signal.expect("0.15% move must fire");
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.system, Some(System::V1));
    }

    #[test]
    fn test_v1_min_bars_between() {
        let config = HybridConfig {
            min_bars_between: 3,
            min_move_percent: 0.0,
            ..v1_config()
        };
        let mut engine = HybridEngine::new(config).unwrap();
        let mut fired_at = Vec::new();

        for i in 0..30i64 {
            let close = dec!(90) + Decimal::from(i) * dec!(2);
            let evaluation = engine.evaluate(&bar(close - dec!(1), close, dec!(1), (i + 1) * 30_000));
            if evaluation.signal.is_some() {
                fired_at.push(i);
            }
        }

        assert!(fired_at.len() >= 2, "expected repeated V1 signals");
        for pair in fired_at.windows(2) {
            assert!(pair[1] - pair[0] >= 3, "signals too close: {fired_at:?}");
        }
    }

    /// Oscillating closes keep the V2 RSI off its rails so a surge bar can
    /// produce a large momentum delta.
    fn feed_chop(engine: &mut HybridEngine, bars: usize, volume: f64) {
        for i in 0..bars {
            let close = if i % 2 == 0 { dec!(100.1) } else { dec!(99.9) };
            let open = if i % 2 == 0 { dec!(99.9) } else { dec!(100.1) };
            engine.evaluate(&bar(
                open,
                close,
                Decimal::from_f64(volume).unwrap(),
                (i as i64 + 1) * 30_000,
            ));
        }
    }

    #[test]
    fn test_v2_surge_long() {
        let mut engine = HybridEngine::new(v2_only_config()).unwrap();

        // Chop around 100 with flat volume 10, ending on a down bar.
        feed_chop(&mut engine, 12, 10.0);

        // Surge bar: strong green candle, volume 30 vs avg 10, RSI jump.
        let evaluation = engine.evaluate(&bar(dec!(99.9), dec!(103), dec!(30), 13 * 30_000));
        let signal = evaluation.signal.expect("V2 surge should fire");
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.reason, SignalReason::V2Long);
        assert_eq!(signal.system, Some(System::V2));
    }

    #[test]
    fn test_v2_requires_volume_spike() {
        let mut engine = HybridEngine::new(v2_only_config()).unwrap();
        feed_chop(&mut engine, 12, 10.0);

        // Same surge but volume at the average: no spike, no signal.
        let evaluation = engine.evaluate(&bar(dec!(99.9), dec!(103), dec!(10), 13 * 30_000));
        assert!(evaluation.signal.is_none());
    }

    #[test]
    fn test_v1_wins_over_v2_on_same_bar() {
        let mut config = v1_config();
        config.v2_ema_fast_len = 2;
        config.v2_ema_mid_len = 3;
        config.v2_ema_slow_len = 5;
        config.v2_rsi_length = 2;
        config.volume_lookback = 4;
        let mut engine = HybridEngine::new(config).unwrap();

        feed_rise(&mut engine, 12, 100.0, 0.2, 10.0);

        // This bar satisfies both systems; V1 is evaluated first and wins.
        let evaluation = engine.evaluate(&bar(dec!(102.2), dec!(106), dec!(30), 13 * 30_000));
        let signal = evaluation.signal.expect("a signal should fire");
        assert_eq!(signal.system, Some(System::V1));
    }

    #[test]
    fn test_exit_flattening_with_volume_drop() {
        let mut engine = HybridEngine::new(HybridConfig::default()).unwrap();
        engine.position_side = PositionSide::Long;
        engine.rsi_history = VecDeque::from([60.0, 59.5, 59.0]);

        // |59 - 60| = 1 < 2 (flattening), volume 5 vs avg 10 -> ratio 0.5 < 1.2.
        let reason = engine.check_exit(5.0, Some(10.0));
        assert_eq!(reason, Some(ExitReason::RsiFlatteningVolumeDrop));
    }

    #[test]
    fn test_exit_rsi_reversal() {
        let mut engine = HybridEngine::new(HybridConfig::default()).unwrap();
        engine.position_side = PositionSide::Long;
        engine.rsi_history = VecDeque::from([60.0, 58.0, 55.0]);

        // |55 - 60| = 5: real momentum against the long.
        let reason = engine.check_exit(20.0, Some(10.0));
        assert_eq!(reason, Some(ExitReason::RsiReversal));
    }

    #[test]
    fn test_exit_short_side_reversal() {
        let mut engine = HybridEngine::new(HybridConfig::default()).unwrap();
        engine.position_side = PositionSide::Short;
        engine.rsi_history = VecDeque::from([40.0, 43.0, 46.0]);

        let reason = engine.check_exit(20.0, Some(10.0));
        assert_eq!(reason, Some(ExitReason::RsiReversal));
    }

    #[test]
    fn test_no_exit_while_momentum_healthy() {
        let mut engine = HybridEngine::new(HybridConfig::default()).unwrap();
        engine.position_side = PositionSide::Long;
        engine.rsi_history = VecDeque::from([55.0, 58.0, 61.0]);

        // Rising RSI on a long with healthy volume: stay in.
        assert_eq!(engine.check_exit(15.0, Some(10.0)), None);
    }

    #[test]
    fn test_exit_needs_three_samples() {
        let mut engine = HybridEngine::new(HybridConfig::default()).unwrap();
        engine.position_side = PositionSide::Long;
        engine.rsi_history = VecDeque::from([60.0, 50.0]);

        assert_eq!(engine.check_exit(5.0, Some(10.0)), None);
    }

    #[test]
    fn test_exit_discards_same_bar_signal() {
        let mut engine = HybridEngine::new(v1_config()).unwrap();
        feed_rise(&mut engine, 12, 100.0, 0.2, 10.0);

        engine.position_changed(PositionSide::Long);
        engine.rsi_history = VecDeque::from([90.0, 85.0, 80.0]);

        // A pullback bar drags the freshly pushed V2 RSI far below the rigged
        // history, forcing a reversal exit which takes precedence over any
        // V1 candidate this bar produces.
        let evaluation = engine.evaluate(&bar(dec!(102.2), dec!(101), dec!(10), 13 * 30_000));
        assert_eq!(evaluation.exit, Some(ExitReason::RsiReversal));
        assert!(evaluation.signal.is_none());
    }

    #[test]
    fn test_regime_gate_allows_while_warming() {
        let engine = HybridEngine::new(HybridConfig::default()).unwrap();
        assert!(engine.regime_allows(25.0));
    }

    #[test]
    fn test_regime_gate_blocks_quiet_market() {
        let config = HybridConfig {
            adx_length: 3,
            ..v2_only_config()
        };
        let mut engine = HybridEngine::new(config).unwrap();

        // Flat closes: ADX warms up to zero directional movement.
        for i in 0..20i64 {
            engine.evaluate(&bar(dec!(100), dec!(100), dec!(10), (i + 1) * 30_000));
        }

        assert!(!engine.regime_allows(25.0), "flat market should be gated");
        assert!(engine.regime_allows(-1.0));
    }
}
