//! Market-data connector plumbing shared by feed implementations.

use common::BinanceEnvironment;
use model::MarketEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by a feed connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("connection closed")]
    ConnectionClosed,
}

/// Configuration of the tick feed. The bot trades one instrument.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Symbol to subscribe to (e.g. "BTCUSDT").
    pub symbol: String,
    /// Channel buffer capacity for market events.
    pub channel_capacity: usize,
    /// Production or testnet endpoints.
    pub environment: BinanceEnvironment,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            channel_capacity: 1024,
            environment: BinanceEnvironment::default(),
        }
    }
}

pub type EventSender = mpsc::Sender<MarketEvent>;
pub type EventReceiver = mpsc::Receiver<MarketEvent>;

pub fn create_event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}
