//! Core strategy types and the engine trait.
//!
//! A strategy engine is a deterministic state machine over closed bars: it
//! owns its indicators and edge-tracking state, and emits at most one
//! [`Signal`] per bar plus, while a position is open, an optional exit
//! recommendation. The orchestrator applies the resulting [`Evaluation`]
//! with exit-before-entry precedence.

mod engine;
mod error;
mod signal;

pub use engine::{Evaluation, SignalEngine};
pub use error::StrategyError;
pub use signal::{
    Direction, ExitReason, IndicatorSnapshot, Signal, SignalReason, System, TrendSnapshot,
};
