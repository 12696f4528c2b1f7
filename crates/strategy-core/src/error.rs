//! Strategy error types.

use thiserror::Error;

/// Errors raised when building or running a strategy engine.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Invalid configuration (fatal at construction).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An indicator rejected its parameters.
    #[error("indicator error: {0}")]
    Indicator(#[from] indicators::IndicatorError),
}
