//! Streaming technical indicators.
//!
//! All indicators are incremental: they consume one value (or one bar's
//! high/low/close) per update and expose their current output as an
//! [`IndicatorValue`], which is `Warming` until the indicator has seen
//! enough data to produce a meaningful number.

mod adx;
mod ema;
mod error;
mod rsi;

pub use adx::Adx;
pub use ema::Ema;
pub use error::IndicatorError;
pub use rsi::Rsi;

/// Output of a streaming indicator.
///
/// `Warming` replaces the nullable outputs of ad-hoc indicator libraries:
/// callers must match (or use [`IndicatorValue::ready`]) instead of reading
/// a possibly-meaningless number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Ready(f64),
    Warming,
}

impl IndicatorValue {
    /// The value if the indicator is warm, `None` otherwise.
    pub fn ready(self) -> Option<f64> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Warming => None,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready(_))
    }
}
