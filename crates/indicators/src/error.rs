//! Indicator error types.

use thiserror::Error;

/// Errors raised at indicator construction.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// The requested length is below the indicator's minimum.
    #[error("{indicator} length {length} is invalid (minimum {min})")]
    InvalidLength {
        indicator: &'static str,
        length: usize,
        min: usize,
    },
}
