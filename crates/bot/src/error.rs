//! Bot error types.

use thiserror::Error;

/// Errors that abort bot construction or its run loop.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration rejected at startup.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A strategy engine rejected its parameters.
    #[error("strategy error: {0}")]
    Strategy(#[from] strategy_core::StrategyError),
}
