//! Live executor placing real market orders.

use std::sync::Arc;

use async_trait::async_trait;
use execution_core::{
    CloseReason, Executor, ExecutorError, OrderSide, TradeInstruction,
};
use model::PositionSide;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::client::BinanceFuturesClient;
use crate::error::BinanceRestError;

/// Executes trade instructions against the live futures API.
///
/// Entries are plain market orders; closes are reduce-only market orders on
/// the opposite side, so a close can never flip the position by accident.
pub struct LiveExecutor {
    client: Arc<BinanceFuturesClient>,
    symbol: String,
}

impl LiveExecutor {
    pub fn new(client: Arc<BinanceFuturesClient>, symbol: impl Into<String>) -> Self {
        Self {
            client,
            symbol: symbol.into(),
        }
    }

    fn client_order_id() -> String {
        format!("bot_{}", Uuid::new_v4().as_simple())
    }

    async fn enter(&self, order: &TradeInstruction) -> Result<(), ExecutorError> {
        let side = OrderSide::to_open(order.side)
            .ok_or_else(|| ExecutorError::Rejected("cannot open a flat position".into()))?;

        let response = self
            .client
            .place_market_order(
                &self.symbol,
                side,
                order.size,
                false,
                &Self::client_order_id(),
            )
            .await
            .map_err(to_executor_error)?;

        info!(
            symbol = %self.symbol,
            side = %order.side,
            size = %order.size,
            order_id = response.order_id,
            reason = %order.signal_reason,
            "entry order placed"
        );
        Ok(())
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    async fn enter_long(&self, order: &TradeInstruction) -> Result<(), ExecutorError> {
        self.enter(order).await
    }

    async fn enter_short(&self, order: &TradeInstruction) -> Result<(), ExecutorError> {
        self.enter(order).await
    }

    async fn close_position(
        &self,
        side: PositionSide,
        size: Decimal,
        price: Decimal,
        reason: CloseReason,
    ) -> Result<(), ExecutorError> {
        let close_side = OrderSide::to_close(side)
            .ok_or_else(|| ExecutorError::Rejected("no position to close".into()))?;

        let response = self
            .client
            .place_market_order(&self.symbol, close_side, size, true, &Self::client_order_id())
            .await
            .map_err(to_executor_error)?;

        info!(
            symbol = %self.symbol,
            closed_side = %side,
            size = %size,
            reference_price = %price,
            reason = %reason,
            order_id = response.order_id,
            "close order placed"
        );
        Ok(())
    }
}

fn to_executor_error(err: BinanceRestError) -> ExecutorError {
    match err {
        BinanceRestError::InsufficientMargin(msg) | BinanceRestError::InsufficientBalance(msg) => {
            ExecutorError::InsufficientBalance(msg)
        }
        BinanceRestError::ApiError { code, message } => ExecutorError::Api { code, message },
        BinanceRestError::Rest(rest) => ExecutorError::Network(rest.to_string()),
        other => ExecutorError::Rejected(other.to_string()),
    }
}
