//! Periodic exchange-state poller feeding the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use execution_core::{ExchangePosition, ExchangeSnapshot};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::client::BinanceFuturesClient;

/// Poll position and balance snapshots on a fixed interval and hand them to
/// the orchestrator queue.
///
/// A flat position snapshot is always emitted, even when the exchange
/// returns no entry for the symbol, so the reconciler can detect externally
/// closed positions. Poll failures are logged and the next tick retries.
pub async fn run_snapshot_poller(
    client: Arc<BinanceFuturesClient>,
    symbol: String,
    poll_interval: Duration,
    tx: mpsc::Sender<ExchangeSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(
        symbol = %symbol,
        interval_ms = poll_interval.as_millis() as u64,
        "snapshot poller started"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }

            _ = interval.tick() => {
                if poll_once(&client, &symbol, &tx).await.is_err() {
                    // Receiver dropped: the orchestrator is gone.
                    break;
                }
            }
        }
    }

    info!("snapshot poller stopped");
}

async fn poll_once(
    client: &BinanceFuturesClient,
    symbol: &str,
    tx: &mpsc::Sender<ExchangeSnapshot>,
) -> Result<(), ()> {
    match client.get_position_risk(symbol).await {
        Ok(positions) => {
            let position = positions
                .into_iter()
                .find(|p| p.symbol == symbol)
                .map(ExchangePosition::from)
                .unwrap_or_else(|| flat_position(symbol));

            debug!(
                side = %position.side(),
                size = %position.size(),
                "position snapshot"
            );
            tx.send(ExchangeSnapshot::Position(position))
                .await
                .map_err(|_| ())?;
        }
        Err(e) => {
            warn!(error = %e, "position poll failed");
        }
    }

    match client.get_balances().await {
        Ok(balances) => {
            if let Some(balance) = balances
                .iter()
                .find(|b| b.asset.eq_ignore_ascii_case("USDT"))
            {
                tx.send(ExchangeSnapshot::Balance {
                    total: balance.balance,
                    available: balance.available_balance,
                })
                .await
                .map_err(|_| ())?;
            }
        }
        Err(e) => {
            warn!(error = %e, "balance poll failed");
        }
    }

    Ok(())
}

fn flat_position(symbol: &str) -> ExchangePosition {
    ExchangePosition {
        symbol: symbol.to_string(),
        position_amt: Decimal::ZERO,
        entry_price: Decimal::ZERO,
        mark_price: Decimal::ZERO,
        unrealized_pnl: Decimal::ZERO,
        leverage: 1,
    }
}
