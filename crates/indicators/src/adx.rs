//! Streaming Wilder average directional index.

use crate::error::IndicatorError;
use crate::IndicatorValue;

/// Average Directional Index used for regime detection.
///
/// Pipeline per update (after the priming bar):
/// 1. True range and directional movements from consecutive highs/lows.
///    A `+DM` is only taken when both high and low moved up, `-DM` only when
///    both moved down.
/// 2. The first `length` TR/±DM samples are buffered; ATR and the smoothed
///    ±DM are then seeded with their simple averages and Wilder-smoothed
///    (`alpha = 1 / length`) afterwards.
/// 3. `DX = 100 * |+DI - -DI| / (+DI + -DI)`, buffered the same way: ADX is
///    seeded with the mean of the first `length` DX samples, then
///    Wilder-smoothed.
///
/// The output stays `Warming` until `2 * length` updates have been consumed.
#[derive(Debug, Clone)]
pub struct Adx {
    length: usize,
    alpha: f64,
    prev: Option<(f64, f64, f64)>,
    tr_buf: Vec<f64>,
    plus_dm_buf: Vec<f64>,
    minus_dm_buf: Vec<f64>,
    atr: f64,
    smoothed_plus_dm: f64,
    smoothed_minus_dm: f64,
    di_seeded: bool,
    dx_buf: Vec<f64>,
    adx: Option<f64>,
}

impl Adx {
    /// Create an ADX over `length` samples.
    ///
    /// # Errors
    /// Returns [`IndicatorError::InvalidLength`] when `length < 2`.
    pub fn new(length: usize) -> Result<Self, IndicatorError> {
        if length < 2 {
            return Err(IndicatorError::InvalidLength {
                indicator: "ADX",
                length,
                min: 2,
            });
        }

        Ok(Self {
            length,
            alpha: 1.0 / length as f64,
            prev: None,
            tr_buf: Vec::with_capacity(length),
            plus_dm_buf: Vec::with_capacity(length),
            minus_dm_buf: Vec::with_capacity(length),
            atr: 0.0,
            smoothed_plus_dm: 0.0,
            smoothed_minus_dm: 0.0,
            di_seeded: false,
            dx_buf: Vec::with_capacity(length),
            adx: None,
        })
    }

    /// Feed one bar's high/low/close and return the current ADX state.
    pub fn update(&mut self, high: f64, low: f64, close: f64) -> IndicatorValue {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((high, low, close)) else {
            return IndicatorValue::Warming;
        };

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());

        let plus_dm = if high > prev_high && low > prev_low {
            (high - prev_high).max(0.0)
        } else {
            0.0
        };
        let minus_dm = if low < prev_low && high < prev_high {
            (prev_low - low).max(0.0)
        } else {
            0.0
        };

        if !self.di_seeded {
            self.tr_buf.push(tr);
            self.plus_dm_buf.push(plus_dm);
            self.minus_dm_buf.push(minus_dm);

            if self.tr_buf.len() < self.length {
                return IndicatorValue::Warming;
            }

            let n = self.length as f64;
            self.atr = self.tr_buf.iter().sum::<f64>() / n;
            self.smoothed_plus_dm = self.plus_dm_buf.iter().sum::<f64>() / n;
            self.smoothed_minus_dm = self.minus_dm_buf.iter().sum::<f64>() / n;
            self.di_seeded = true;
        } else {
            self.atr = tr * self.alpha + self.atr * (1.0 - self.alpha);
            self.smoothed_plus_dm = plus_dm * self.alpha + self.smoothed_plus_dm * (1.0 - self.alpha);
            self.smoothed_minus_dm =
                minus_dm * self.alpha + self.smoothed_minus_dm * (1.0 - self.alpha);
        }

        let dx = self.directional_index();

        match self.adx {
            None => {
                self.dx_buf.push(dx);
                if self.dx_buf.len() == self.length {
                    self.adx = Some(self.dx_buf.iter().sum::<f64>() / self.length as f64);
                }
            }
            Some(adx) => {
                self.adx = Some(dx * self.alpha + adx * (1.0 - self.alpha));
            }
        }

        self.value()
    }

    fn directional_index(&self) -> f64 {
        if self.atr == 0.0 {
            return 0.0;
        }
        let plus_di = 100.0 * self.smoothed_plus_dm / self.atr;
        let minus_di = 100.0 * self.smoothed_minus_dm / self.atr;
        let di_sum = plus_di + minus_di;
        if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        }
    }

    pub fn value(&self) -> IndicatorValue {
        match self.adx {
            Some(v) => IndicatorValue::Ready(v),
            None => IndicatorValue::Warming,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.adx.is_some()
    }

    /// True when the ADX is warm and above `threshold`.
    pub fn is_trending(&self, threshold: f64) -> bool {
        matches!(self.adx, Some(adx) if adx > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_trend(adx: &mut Adx, bars: usize, step: f64) {
        for i in 0..bars {
            let base = 100.0 + i as f64 * step;
            adx.update(base + 3.0, base - 3.0, base + 2.0);
        }
    }

    #[test]
    fn test_short_length_rejected() {
        assert!(matches!(
            Adx::new(1),
            Err(IndicatorError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_warming_until_two_lengths() {
        let len = 5;
        let mut adx = Adx::new(len).unwrap();

        for i in 0..(2 * len - 1) {
            let base = 100.0 + i as f64;
            let out = adx.update(base + 2.0, base - 2.0, base + 1.0);
            assert_eq!(out, IndicatorValue::Warming, "ready too early at {i}");
        }

        let out = adx.update(120.0, 116.0, 119.0);
        assert!(out.is_ready(), "should be ready after 2 * length updates");
    }

    #[test]
    fn test_bounds() {
        let mut adx = Adx::new(3).unwrap();
        let bars = [
            (105.0, 95.0, 102.0),
            (108.0, 100.0, 106.0),
            (107.0, 98.0, 99.0),
            (103.0, 97.0, 101.0),
            (106.0, 100.0, 105.0),
            (110.0, 103.0, 108.0),
            (112.0, 106.0, 110.0),
            (111.0, 104.0, 105.0),
            (109.0, 103.0, 107.0),
            (113.0, 105.0, 112.0),
        ];
        for (h, l, c) in bars {
            if let IndicatorValue::Ready(v) = adx.update(h, l, c) {
                assert!((0.0..=100.0).contains(&v), "ADX out of bounds: {v}");
            }
        }
    }

    #[test]
    fn test_strong_trend_elevates_adx() {
        let mut adx = Adx::new(5).unwrap();
        feed_trend(&mut adx, 30, 5.0);

        let v = adx.value().ready().unwrap();
        assert!(v > 20.0, "ADX should be elevated in a strong trend, got {v}");
        assert!(adx.is_trending(20.0));
    }

    #[test]
    fn test_is_trending_while_warming() {
        let adx = Adx::new(5).unwrap();
        assert!(!adx.is_trending(0.0));
    }
}
