//! Typed client for the Binance USDⓈ-M futures REST API.
//!
//! - **Time synchronization**: adjusts for clock skew so signed requests
//!   stay inside the server's receive window
//! - **Account state**: position-risk and balance queries for the
//!   reconciliation poller
//! - **Order entry**: market orders (optionally reduce-only) and leverage
//!   configuration
//! - **Error handling**: typed errors; the margin/balance rejections the
//!   orchestrator treats as recoverable are distinct variants
//!
//! The crate also hosts the [`LiveExecutor`] (the live implementation of
//! `execution_core::Executor`) and the periodic snapshot poller feeding the
//! orchestrator.

mod client;
mod error;
mod executor;
mod poller;
mod responses;

pub use client::BinanceFuturesClient;
pub use error::BinanceRestError;
pub use executor::LiveExecutor;
pub use poller::run_snapshot_poller;
pub use responses::{
    FuturesBalanceResponse, LeverageResponse, NewOrderResponse, PositionRiskResponse,
    ServerTimeResponse,
};
