//! Streaming Wilder-style relative strength index.

use crate::error::IndicatorError;
use crate::IndicatorValue;

/// Relative Strength Index.
///
/// Average gains and losses are simple cumulative means over the first
/// `length` price changes, then switch to Wilder smoothing with
/// `alpha = 1 / length`. Output is always within `[0, 100]`.
///
/// Edge cases:
/// - `avg_loss == 0 && avg_gain > 0` -> 100
/// - `avg_gain == 0 && avg_loss == 0` -> 50
/// - `avg_gain == 0` -> 0
#[derive(Debug, Clone)]
pub struct Rsi {
    length: usize,
    alpha: f64,
    prev_input: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    update_count: usize,
    last_output: f64,
}

impl Rsi {
    /// Create an RSI over `length` price changes.
    ///
    /// # Errors
    /// Returns [`IndicatorError::InvalidLength`] when `length < 2`.
    pub fn new(length: usize) -> Result<Self, IndicatorError> {
        if length < 2 {
            return Err(IndicatorError::InvalidLength {
                indicator: "RSI",
                length,
                min: 2,
            });
        }

        Ok(Self {
            length,
            alpha: 1.0 / length as f64,
            prev_input: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            update_count: 0,
            last_output: 50.0,
        })
    }

    /// Feed one sample and return the updated RSI.
    pub fn update(&mut self, input: f64) -> f64 {
        self.update_count += 1;

        let Some(prev) = self.prev_input else {
            self.prev_input = Some(input);
            self.last_output = 50.0;
            return self.last_output;
        };

        let delta = input - prev;
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        self.prev_input = Some(input);

        let changes = self.update_count - 1;
        if changes <= self.length {
            // Cumulative simple mean until the window is full.
            let n = changes as f64;
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        } else {
            self.avg_gain = gain * self.alpha + self.avg_gain * (1.0 - self.alpha);
            self.avg_loss = loss * self.alpha + self.avg_loss * (1.0 - self.alpha);
        }

        self.last_output = if self.avg_loss == 0.0 {
            if self.avg_gain > 0.0 {
                100.0
            } else {
                50.0
            }
        } else if self.avg_gain == 0.0 {
            0.0
        } else {
            100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
        };

        self.last_output
    }

    pub fn value(&self) -> IndicatorValue {
        if self.is_ready() {
            IndicatorValue::Ready(self.last_output)
        } else {
            IndicatorValue::Warming
        }
    }

    pub fn is_ready(&self) -> bool {
        self.update_count >= self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_length_rejected() {
        assert!(matches!(
            Rsi::new(1),
            Err(IndicatorError::InvalidLength { .. })
        ));
        assert!(Rsi::new(2).is_ok());
    }

    #[test]
    fn test_first_update_is_neutral() {
        let mut rsi = Rsi::new(14).unwrap();
        assert_eq!(rsi.update(100.0), 50.0);
        assert_eq!(rsi.value(), IndicatorValue::Warming);
    }

    #[test]
    fn test_all_gains_saturates_at_100() {
        let mut rsi = Rsi::new(3).unwrap();
        let mut last = 0.0;
        for i in 0..6 {
            last = rsi.update(100.0 + i as f64);
        }
        assert_eq!(last, 100.0);
        assert!(rsi.is_ready());
    }

    #[test]
    fn test_all_losses_saturates_at_0() {
        let mut rsi = Rsi::new(3).unwrap();
        let mut last = 50.0;
        for i in 0..6 {
            last = rsi.update(100.0 - i as f64);
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_flat_input_is_neutral() {
        let mut rsi = Rsi::new(3).unwrap();
        let mut last = 0.0;
        for _ in 0..6 {
            last = rsi.update(100.0);
        }
        assert_eq!(last, 50.0);
    }

    #[test]
    fn test_mixed_changes_within_bounds() {
        // Closes: 44, 44.34, 44.09, 43.61, 44.33
        let mut rsi = Rsi::new(3).unwrap();
        for px in [44.0, 44.34, 44.09, 43.61] {
            rsi.update(px);
        }
        let v = rsi.update(44.33);
        assert!(v > 0.0 && v < 100.0, "rsi was {v}");
    }

    #[test]
    fn test_bounds_hold_under_noise() {
        let mut rsi = Rsi::new(4).unwrap();
        for px in [100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0] {
            let v = rsi.update(px);
            assert!((0.0..=100.0).contains(&v), "rsi out of bounds: {v}");
        }
    }

    #[test]
    fn test_ready_after_length_updates() {
        let mut rsi = Rsi::new(5).unwrap();
        for i in 0..4 {
            rsi.update(100.0 + i as f64);
            assert!(!rsi.is_ready());
        }
        rsi.update(104.0);
        assert!(rsi.is_ready());
    }
}
