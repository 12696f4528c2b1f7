//! Streaming exponential moving average.

use crate::error::IndicatorError;
use crate::IndicatorValue;

/// Exponential moving average with smoothing factor `2 / (length + 1)`.
///
/// The first update seeds the value directly; there is no separate warm-up
/// window beyond that single sample.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// Create an EMA over `length` samples.
    ///
    /// # Errors
    /// Returns [`IndicatorError::InvalidLength`] when `length` is zero.
    pub fn new(length: usize) -> Result<Self, IndicatorError> {
        if length < 1 {
            return Err(IndicatorError::InvalidLength {
                indicator: "EMA",
                length,
                min: 1,
            });
        }

        Ok(Self {
            alpha: 2.0 / (length as f64 + 1.0),
            value: None,
        })
    }

    /// Feed one sample and return the updated average.
    pub fn update(&mut self, input: f64) -> f64 {
        let next = match self.value {
            None => input,
            Some(prev) => input * self.alpha + prev * (1.0 - self.alpha),
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> IndicatorValue {
        match self.value {
            Some(v) => IndicatorValue::Ready(v),
            None => IndicatorValue::Warming,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }
}
