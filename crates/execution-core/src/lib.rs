//! Core execution types and state machines.
//!
//! This crate provides the pieces between a strategy signal and the
//! exchange:
//!
//! - **Instruction types**: `TradeInstruction`, `OrderSide`, `CloseReason`
//! - **Position state**: `PositionStateManager` reconciling the local view
//!   against polled exchange snapshots with tolerance matching and
//!   override rules
//! - **Order tracking**: `OrderTracker` with pending-order expiry and
//!   confirmation by observed position change
//! - **Executor seam**: the `Executor` trait with a recording
//!   `DryRunExecutor`; the live implementation lives with the exchange
//!   client

mod executor;
mod order;
mod position;
mod tracker;

pub use executor::{DryRunExecutor, DryRunFill, Executor, ExecutorError, FillKind};
pub use order::{CloseReason, OrderSide, TradeInstruction};
pub use position::{
    ExchangePosition, ExchangeSnapshot, LocalPosition, LocalPositionState, PositionStateManager,
    MAX_RECONCILE_FAILURES,
};
pub use tracker::{OrderTracker, PendingOrder, ORDER_TIMEOUT_MS};
