//! The bot orchestrator.
//!
//! Wires the full pipeline: ticks feed the bar builder, closed bars run
//! protective-exit checks and then the strategy engine, signals pass the
//! orchestrator's gates (warmup, freeze, dedup, regime, same-side, flip
//! budget, minimum hold, balance) before reaching the executor, and the
//! polled exchange snapshot reconciles local position state with a
//! freeze-on-divergence policy.
//!
//! # Architecture
//!
//! ```text
//! ticks ──> BarBuilder ──(closed bar)──> protective exits ──> SignalEngine
//!                                                                  │
//!            Executor <── gates (warmup/freeze/dedup/flip/…) <── signal
//!               │
//!            exchange ──(2 s poll)──> PositionStateManager ──> freeze /
//!                                                              confirm orders
//! ```
//!
//! All of the above runs on one task; the orchestrator's `select!` loop is
//! the only consumer of both the market-event and the snapshot channel, so
//! bar closes, signal handling and executor calls are strictly serialized.

mod config;
mod error;
mod events;
mod flip;
mod orchestrator;

pub use config::{
    BotConfig, ConfigError, StrategyKind, FREEZE_DURATION_MS, MAX_PROCESSED_SIGNALS,
    MIN_HOLD_BARS, WARMUP_BARS,
};
pub use error::BotError;
pub use events::BotEvents;
pub use flip::FlipBudget;
pub use orchestrator::TradingBot;
