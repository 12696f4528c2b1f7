//! Pending-order bookkeeping with timeout-based expiry.

use model::PositionSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

/// Unconfirmed orders are purged after this long.
pub const ORDER_TIMEOUT_MS: i64 = 30_000;

/// Size tolerance when matching an observed position change to an order.
const SIZE_TOLERANCE: Decimal = dec!(0.0001);

/// A submitted order awaiting confirmation through a position change.
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub id: String,
    pub side: PositionSide,
    pub size: Decimal,
    pub price: Decimal,
    pub timestamp_ms: i64,
    pub confirmed: bool,
    pub confirmed_at_ms: Option<i64>,
    expires_at_ms: i64,
}

/// Tracks submitted orders until the polled exchange state confirms them.
///
/// There are no per-order timers: each order carries a monotonic expiry
/// timestamp and [`OrderTracker::purge_expired`] is invoked on every
/// reconciliation pass. Insertion order is preserved so confirmation hits
/// the oldest matching order first.
#[derive(Debug, Default)]
pub struct OrderTracker {
    orders: Vec<PendingOrder>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted order.
    pub fn track_order(
        &mut self,
        id: impl Into<String>,
        side: PositionSide,
        size: Decimal,
        price: Decimal,
        now_ms: i64,
    ) {
        let id = id.into();
        debug!(order_id = %id, %side, %size, %price, "tracking pending order");
        self.orders.push(PendingOrder {
            id,
            side,
            size,
            price,
            timestamp_ms: now_ms,
            confirmed: false,
            confirmed_at_ms: None,
            expires_at_ms: now_ms + ORDER_TIMEOUT_MS,
        });
    }

    /// Confirm the first unconfirmed order matching the observed position
    /// change by side and size (within tolerance). Returns its id.
    pub fn confirm_by_position_change(
        &mut self,
        side: PositionSide,
        observed_size: Decimal,
        now_ms: i64,
    ) -> Option<String> {
        let order = self.orders.iter_mut().find(|order| {
            !order.confirmed
                && order.side == side
                && (order.size - observed_size).abs() < SIZE_TOLERANCE
        })?;

        order.confirmed = true;
        order.confirmed_at_ms = Some(now_ms);
        debug!(order_id = %order.id, %side, "order confirmed by position change");
        Some(order.id.clone())
    }

    /// Drop orders past their expiry. Unconfirmed ones are warned about;
    /// confirmed ones have served their purpose and leave silently.
    pub fn purge_expired(&mut self, now_ms: i64) -> Vec<String> {
        let mut purged = Vec::new();
        self.orders.retain(|order| {
            if now_ms < order.expires_at_ms {
                return true;
            }
            if !order.confirmed {
                warn!(
                    order_id = %order.id,
                    age_ms = now_ms - order.timestamp_ms,
                    "pending order expired without confirmation"
                );
                purged.push(order.id.clone());
            }
            false
        });
        purged
    }

    pub fn get(&self, id: &str) -> Option<&PendingOrder> {
        self.orders.iter().find(|order| order.id == id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
