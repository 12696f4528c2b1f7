//! Signal-bot entry point.
//!
//! Wires the trade-stream connector, the exchange snapshot poller, the
//! executor (dry-run or live) and the bot orchestrator, then runs until
//! Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! # Dry-run on production market data (default)
//! signal-bot BTCUSDT
//!
//! # Live trading on the testnet
//! signal-bot --testnet --live BTCUSDT
//! ```
//!
//! Configuration comes from `SIGNAL_BOT_*` environment variables (see
//! `bot::BotConfig`), credentials from `BINANCE_API_KEY` /
//! `BINANCE_SECRET_KEY`.

use std::sync::Arc;
use std::time::Duration;

use auth::ApiCredentials;
use binance_rest::{run_snapshot_poller, BinanceFuturesClient, LiveExecutor};
use bot::{BotConfig, TradingBot};
use common::BinanceEnvironment;
use connector_binance::run_connector;
use connector_core::{create_event_channel, ConnectorConfig};
use execution_core::{DryRunExecutor, ExchangeSnapshot, Executor};
use metrics::create_metrics;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

fn print_usage() {
    eprintln!("Usage: signal-bot [OPTIONS] [SYMBOL]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --testnet     Use the futures testnet (fake money)");
    eprintln!("  --live        Enable live trading (requires API keys)");
    eprintln!("  --help        Show this help message");
    eprintln!();
    eprintln!("Environment variables:");
    eprintln!("  BINANCE_API_KEY       API key for signed requests");
    eprintln!("  BINANCE_SECRET_KEY    Secret key for signing");
    eprintln!("  BINANCE_ENVIRONMENT   'production' (default) or 'testnet'");
    eprintln!("  SIGNAL_BOT_*          Strategy and risk configuration");
}

#[tokio::main]
async fn main() {
    match dotenvy::dotenv() {
        Ok(path) => eprintln!("Loaded environment from: {}", path.display()),
        Err(dotenvy::Error::Io(_)) => {}
        Err(e) => eprintln!("Warning: failed to load .env file: {e}"),
    }

    common::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut use_testnet = false;
    let mut live_flag = false;
    let mut symbol_arg = None;

    for arg in &args {
        match arg.as_str() {
            "--testnet" | "-t" => use_testnet = true,
            "--live" | "-l" => live_flag = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown option: {s}");
                print_usage();
                std::process::exit(1);
            }
            symbol => symbol_arg = Some(symbol.to_uppercase()),
        }
    }

    let mut config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    if let Some(symbol) = symbol_arg {
        config.symbol = symbol;
    }
    if live_flag {
        config.live_trading = true;
    }

    let environment = if use_testnet {
        BinanceEnvironment::Testnet
    } else {
        BinanceEnvironment::from_env()
    };

    if config.live_trading && environment.is_production() {
        warn!("Live trading on PRODUCTION with REAL MONEY!");
        warn!("Press Ctrl+C within 5 seconds to abort...");
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    info!(
        environment = %environment,
        symbol = %config.symbol,
        strategy = %config.strategy,
        live_trading = config.live_trading,
        "starting signal bot"
    );

    // Credentials are needed for the snapshot poller and for live trading.
    let credentials = match ApiCredentials::from_env() {
        Ok(creds) => {
            info!(api_key = %creds.api_key(), "loaded API credentials");
            Some(creds)
        }
        Err(e) => {
            info!(
                reason = %e,
                "no API credentials, running without reconciliation (market data only)"
            );
            if config.live_trading {
                error!("--live requires BINANCE_API_KEY and BINANCE_SECRET_KEY");
                std::process::exit(1);
            }
            None
        }
    };

    let rest_client = credentials.and_then(|creds| {
        match BinanceFuturesClient::with_environment(creds, environment) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                error!(error = %e, "failed to create REST client");
                None
            }
        }
    });
    if let Some(client) = &rest_client {
        if let Err(e) = client.sync_time().await {
            warn!(error = %e, "failed to sync server time, signed requests may be rejected");
        }
        if config.live_trading {
            match client.set_leverage(&config.symbol, config.max_leverage).await {
                Ok(response) => info!(leverage = response.leverage, "leverage configured"),
                Err(e) => warn!(error = %e, "failed to set leverage"),
            }
        }
    } else if config.live_trading {
        error!("live trading requires a working REST client");
        std::process::exit(1);
    }

    let executor: Arc<dyn Executor> = match (&rest_client, config.live_trading) {
        (Some(client), true) => {
            Arc::new(LiveExecutor::new(Arc::clone(client), config.symbol.clone()))
        }
        _ => Arc::new(DryRunExecutor::new()),
    };

    let metrics = create_metrics();
    let (market_tx, market_rx) = create_event_channel(1024);
    let (snapshot_tx, snapshot_rx) = mpsc::channel::<ExchangeSnapshot>(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Market-data connector.
    let connector_config = ConnectorConfig {
        symbol: config.symbol.clone(),
        channel_capacity: 1024,
        environment,
    };
    let connector_metrics = metrics.clone();
    let connector_shutdown = shutdown_rx.clone();
    let connector_handle = tokio::spawn(async move {
        if let Err(e) =
            run_connector(connector_config, market_tx, connector_shutdown, connector_metrics).await
        {
            error!(error = %e, "market connector error");
        }
    });

    // Exchange snapshot poller.
    let poller_handle = rest_client.map(|client| {
        let poller_shutdown = shutdown_rx.clone();
        let symbol = config.symbol.clone();
        let interval = Duration::from_millis(config.poll_interval_ms);
        tokio::spawn(run_snapshot_poller(
            client,
            symbol,
            interval,
            snapshot_tx,
            poller_shutdown,
        ))
    });

    // The orchestrator.
    let trading_bot = match TradingBot::new(config, executor, metrics.clone()) {
        Ok(bot) => bot,
        Err(e) => {
            error!(error = %e, "failed to build trading bot");
            std::process::exit(1);
        }
    };
    let bot_shutdown = shutdown_rx.clone();
    let bot_handle = tokio::spawn(trading_bot.run(market_rx, snapshot_rx, bot_shutdown));

    // Ctrl+C triggers shutdown.
    let shutdown_trigger = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, initiating shutdown");
            let _ = shutdown_trigger.send(true);
        }
    });

    // Periodic health log.
    let health_metrics = metrics.clone();
    let mut health_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = health_metrics.snapshot();
                    info!(
                        status = %snapshot.health_status(),
                        ticks = snapshot.ticks_received,
                        ticks_per_sec = format!("{:.1}", snapshot.ticks_per_second),
                        bars = snapshot.bars_closed,
                        signals = snapshot.signals_emitted,
                        errors = snapshot.websocket_errors + snapshot.parse_errors,
                        reconnects = snapshot.reconnect_attempts,
                        "health check"
                    );
                }
                _ = health_shutdown.changed() => {
                    if *health_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    info!("signal bot running, press Ctrl+C to stop");

    let _ = bot_handle.await;
    info!("bot stopped, waiting for remaining tasks");

    let _ = connector_handle.await;
    if let Some(handle) = poller_handle {
        let _ = handle.await;
    }

    println!("\n{}", metrics.snapshot());
    info!("shutdown complete");
}
