//! WebSocket session management with automatic reconnection.

use common::Backoff;
use connector_core::{ConnectorConfig, ConnectorError, EventSender};
use futures_util::{SinkExt, StreamExt};
use metrics::SharedMetrics;
use model::MarketEvent;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::parser::{parse_message, ParsedMessage};

/// A connection this old counts as stable and resets the backoff.
const STABLE_CONNECTION_THRESHOLD: Duration = Duration::from_secs(300);

/// Timeout for WebSocket connection attempts.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

fn build_stream_url(config: &ConnectorConfig) -> String {
    format!(
        "{}/ws/{}@aggTrade",
        config.environment.ws_base_url(),
        config.symbol.to_lowercase()
    )
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Why a session ended.
enum SessionResult {
    /// Shutdown was requested.
    Shutdown,
    /// We were connected for `duration`, then lost the connection.
    Disconnected {
        duration: Duration,
        error: ConnectorError,
    },
    /// The connection attempt itself failed.
    ConnectFailed(ConnectorError),
}

async fn connect(
    url: &str,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<Option<WsStream>, ConnectorError> {
    tokio::select! {
        biased;

        _ = shutdown_rx.changed() => {
            if *shutdown_rx.borrow() {
                return Ok(None);
            }
            Err(ConnectorError::WebSocket("connection interrupted".to_string()))
        }

        result = tokio::time::timeout(CONNECTION_TIMEOUT, connect_async(url)) => {
            match result {
                Ok(Ok((stream, _))) => Ok(Some(stream)),
                Ok(Err(e)) => Err(ConnectorError::WebSocket(e.to_string())),
                Err(_) => Err(ConnectorError::WebSocket("connection timeout".to_string())),
            }
        }
    }
}

/// Run one WebSocket session until shutdown or disconnect.
async fn run_session(
    url: &str,
    sender: &EventSender,
    shutdown_rx: &mut watch::Receiver<bool>,
    metrics: &SharedMetrics,
) -> SessionResult {
    info!(url = %url, "connecting to trade stream");

    let ws_stream = match connect(url, shutdown_rx).await {
        Ok(Some(stream)) => stream,
        Ok(None) => return SessionResult::Shutdown,
        Err(e) => return SessionResult::ConnectFailed(e),
    };

    info!("trade stream connected");
    let connected_at = std::time::Instant::now();
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("shutdown signal received, closing trade stream");
                    let _ = write.close().await;
                    return SessionResult::Shutdown;
                }
            }

            msg_opt = read.next() => {
                let msg = match msg_opt {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        metrics.inc_websocket_errors();
                        return SessionResult::Disconnected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::WebSocket(e.to_string()),
                        };
                    }
                    None => {
                        info!("trade stream ended");
                        return SessionResult::Disconnected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::ConnectionClosed,
                        };
                    }
                };

                match msg {
                    Message::Text(text) => {
                        metrics.inc_messages_received();
                        match parse_message(&text) {
                            Ok(ParsedMessage::Tick(tick)) => {
                                metrics.inc_ticks_received();
                                if sender.send(MarketEvent::Tick(tick)).await.is_err() {
                                    info!("receiver dropped, stopping connector");
                                    return SessionResult::Disconnected {
                                        duration: connected_at.elapsed(),
                                        error: ConnectorError::ChannelClosed,
                                    };
                                }
                            }
                            Ok(ParsedMessage::Unknown) => {}
                            Err(e) => {
                                metrics.inc_parse_errors();
                                warn!(error = %e, "failed to parse stream message");
                            }
                        }
                    }
                    Message::Ping(data) => {
                        debug!("ping received, answering with pong");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            warn!(error = %e, "failed to send pong");
                            metrics.inc_websocket_errors();
                            return SessionResult::Disconnected {
                                duration: connected_at.elapsed(),
                                error: ConnectorError::WebSocket(e.to_string()),
                            };
                        }
                    }
                    Message::Close(_) => {
                        info!("trade stream closed by server");
                        return SessionResult::Disconnected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::ConnectionClosed,
                        };
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Run the connector until shutdown, reconnecting with backoff on errors.
pub async fn run_connector(
    config: ConnectorConfig,
    sender: EventSender,
    mut shutdown_rx: watch::Receiver<bool>,
    metrics: SharedMetrics,
) -> Result<(), ConnectorError> {
    let url = build_stream_url(&config);
    let mut backoff = Backoff::default();
    let mut was_connected = false;

    loop {
        if *shutdown_rx.borrow() {
            info!("shutdown requested, exiting connector");
            return Ok(());
        }

        let error = match run_session(&url, &sender, &mut shutdown_rx, &metrics).await {
            SessionResult::Shutdown => {
                info!("connector shutdown complete");
                return Ok(());
            }
            SessionResult::Disconnected { duration, error } => {
                if was_connected {
                    metrics.inc_reconnect_successes();
                }
                was_connected = true;

                if matches!(error, ConnectorError::ChannelClosed) {
                    info!("event channel closed, exiting connector");
                    return Err(ConnectorError::ChannelClosed);
                }

                if duration >= STABLE_CONNECTION_THRESHOLD {
                    info!(
                        duration_secs = duration.as_secs(),
                        "connection was stable, resetting backoff"
                    );
                    backoff.reset();
                }
                error
            }
            SessionResult::ConnectFailed(error) => error,
        };

        metrics.inc_reconnect_attempts();
        let delay = backoff.next_delay();
        warn!(
            error = %error,
            attempt = backoff.attempt(),
            delay_secs = delay.as_secs_f64(),
            "trade stream lost, reconnecting"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("shutdown requested during backoff");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::BinanceEnvironment;

    #[test]
    fn test_stream_url_production() {
        let config = ConnectorConfig {
            symbol: "BTCUSDT".to_string(),
            channel_capacity: 16,
            environment: BinanceEnvironment::Production,
        };
        assert_eq!(
            build_stream_url(&config),
            "wss://fstream.binance.com/ws/btcusdt@aggTrade"
        );
    }

    #[test]
    fn test_stream_url_testnet() {
        let config = ConnectorConfig {
            symbol: "ethusdt".to_string(),
            channel_capacity: 16,
            environment: BinanceEnvironment::Testnet,
        };
        assert_eq!(
            build_stream_url(&config),
            "wss://stream.binancefuture.com/ws/ethusdt@aggTrade"
        );
    }
}
