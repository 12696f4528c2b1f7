//! The executor seam between the orchestrator and the exchange.

use async_trait::async_trait;
use model::PositionSide;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::order::{CloseReason, TradeInstruction};

/// Errors surfaced by an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The exchange refused the order for lack of margin or balance.
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    /// An exchange API error with its wire code.
    #[error("exchange error {code}: {message}")]
    Api { code: i32, message: String },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The order was rejected for a non-balance reason.
    #[error("order rejected: {0}")]
    Rejected(String),
}

impl ExecutorError {
    /// Whether this error means "not enough funds" rather than a real fault.
    ///
    /// Recognized from the futures margin/balance error codes (-2019, -2010)
    /// or from the message text.
    pub fn is_balance_related(&self) -> bool {
        match self {
            Self::InsufficientBalance(_) => true,
            Self::Api { code: -2019, .. } | Self::Api { code: -2010, .. } => true,
            Self::Api { message, .. } | Self::Network(message) | Self::Rejected(message) => {
                let lower = message.to_lowercase();
                lower.contains("balance") || lower.contains("insufficient")
            }
        }
    }
}

/// Places and closes positions on behalf of the orchestrator.
///
/// All operations are market-style. Implementations may fail; balance
/// related failures are recoverable (the orchestrator skips the signal and
/// keeps running).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn enter_long(&self, order: &TradeInstruction) -> Result<(), ExecutorError>;

    async fn enter_short(&self, order: &TradeInstruction) -> Result<(), ExecutorError>;

    async fn close_position(
        &self,
        side: PositionSide,
        size: Decimal,
        price: Decimal,
        reason: CloseReason,
    ) -> Result<(), ExecutorError>;
}

/// What a recorded dry-run fill was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillKind {
    Entry,
    Close,
}

/// One simulated fill recorded by the dry-run executor.
#[derive(Debug, Clone)]
pub struct DryRunFill {
    pub kind: FillKind,
    pub side: PositionSide,
    pub size: Decimal,
    pub price: Decimal,
    pub reason: String,
}

/// Records every instruction in memory and logs it, never touching the
/// exchange. Fills are assumed immediate and complete.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    fills: Mutex<Vec<DryRunFill>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> Vec<DryRunFill> {
        self.fills.lock().clone()
    }

    fn record_entry(&self, order: &TradeInstruction) {
        info!(
            side = %order.side,
            size = %order.size,
            leverage = order.leverage,
            price = %order.price,
            reason = %order.signal_reason,
            "[DRY RUN] would open position"
        );
        self.fills.lock().push(DryRunFill {
            kind: FillKind::Entry,
            side: order.side,
            size: order.size,
            price: order.price,
            reason: order.signal_reason.clone(),
        });
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    async fn enter_long(&self, order: &TradeInstruction) -> Result<(), ExecutorError> {
        self.record_entry(order);
        Ok(())
    }

    async fn enter_short(&self, order: &TradeInstruction) -> Result<(), ExecutorError> {
        self.record_entry(order);
        Ok(())
    }

    async fn close_position(
        &self,
        side: PositionSide,
        size: Decimal,
        price: Decimal,
        reason: CloseReason,
    ) -> Result<(), ExecutorError> {
        info!(
            %side,
            %size,
            %price,
            reason = %reason,
            "[DRY RUN] would close position"
        );
        self.fills.lock().push(DryRunFill {
            kind: FillKind::Close,
            side,
            size,
            price,
            reason: reason.as_str().to_string(),
        });
        Ok(())
    }
}
