//! Local position state and reconciliation against polled exchange state.

use model::PositionSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Position sizes closer than this are considered equal.
const SIZE_TOLERANCE: Decimal = dec!(0.0001);

/// Relative entry-price deviation accepted during reconciliation (1 %).
const ENTRY_PRICE_TOLERANCE: Decimal = dec!(0.01);

/// Consecutive reconciliation failures after which trading freezes.
pub const MAX_RECONCILE_FAILURES: u32 = 2;

/// The bot's own view of its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPosition {
    pub side: PositionSide,
    pub size: Decimal,
    pub entry_price: Option<Decimal>,
    pub opened_at_ms: Option<i64>,
}

impl LocalPosition {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.side.is_flat()
    }
}

/// One position record from the exchange's position endpoint, with the wire
/// strings already parsed. A flat snapshot carries `position_amt == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangePosition {
    pub symbol: String,
    /// Signed: positive = long, negative = short.
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub leverage: u32,
}

impl ExchangePosition {
    pub fn side(&self) -> PositionSide {
        if self.position_amt > Decimal::ZERO {
            PositionSide::Long
        } else if self.position_amt < Decimal::ZERO {
            PositionSide::Short
        } else {
            PositionSide::Flat
        }
    }

    pub fn size(&self) -> Decimal {
        self.position_amt.abs()
    }
}

/// Snapshots handed from the exchange poller to the orchestrator.
#[derive(Debug, Clone)]
pub enum ExchangeSnapshot {
    Position(ExchangePosition),
    Balance { total: Decimal, available: Decimal },
}

/// Reconciled local position state.
#[derive(Debug, Clone, Default)]
pub struct LocalPositionState {
    pub size: Decimal,
    pub side: PositionSide,
    pub avg_entry: Decimal,
    pub unrealized_pnl: Decimal,
    pub last_update_ms: i64,
    pub pending_order: Option<String>,
}

/// Reconciles the bot's position view against polled exchange snapshots.
///
/// Matching is tolerance based (size within `1e-4`, entry price within 1 %
/// relative, an exchange entry price of zero matches anything). Two override
/// rules trust the exchange outright: a flat exchange against a non-flat
/// local view (position closed externally) and a non-flat exchange against a
/// flat local view (restart, or a position opened externally). Anything else
/// counts as a divergence; two in a row make the bot freeze-eligible.
#[derive(Debug, Default)]
pub struct PositionStateManager {
    state: LocalPositionState,
    consecutive_failures: u32,
}

impl PositionStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LocalPositionState {
        &self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True once enough consecutive failures accumulated to warrant a freeze.
    pub fn should_freeze(&self) -> bool {
        self.consecutive_failures >= MAX_RECONCILE_FAILURES
    }

    pub fn pending_order(&self) -> Option<&str> {
        self.state.pending_order.as_deref()
    }

    pub fn set_pending_order(&mut self, order_id: impl Into<String>) {
        self.state.pending_order = Some(order_id.into());
    }

    pub fn clear_pending_order(&mut self) {
        self.state.pending_order = None;
    }

    /// Record a locally initiated entry (optimistic, before the exchange
    /// confirms it).
    pub fn apply_local_entry(&mut self, side: PositionSide, size: Decimal, entry: Decimal, now_ms: i64) {
        self.state.side = side;
        self.state.size = size;
        self.state.avg_entry = entry;
        self.state.unrealized_pnl = Decimal::ZERO;
        self.state.last_update_ms = now_ms;
    }

    /// Record a locally initiated close.
    pub fn apply_local_flat(&mut self, now_ms: i64) {
        self.state.side = PositionSide::Flat;
        self.state.size = Decimal::ZERO;
        self.state.avg_entry = Decimal::ZERO;
        self.state.unrealized_pnl = Decimal::ZERO;
        self.state.last_update_ms = now_ms;
    }

    /// Reconcile against a polled snapshot. Returns `true` when the local
    /// state now reflects the exchange (matched or overridden).
    pub fn update_from_rest(&mut self, rest: &ExchangePosition, now_ms: i64) -> bool {
        let rest_side = rest.side();
        let rest_size = rest.size();

        let size_match = (rest_size - self.state.size).abs() < SIZE_TOLERANCE;
        let side_match = rest_side == self.state.side;
        let both_flat = rest_side.is_flat() && self.state.side.is_flat();

        let entry_match = both_flat
            || rest.entry_price.is_zero()
            || ((rest.entry_price - self.state.avg_entry).abs() / rest.entry_price)
                < ENTRY_PRICE_TOLERANCE;

        if size_match && side_match && entry_match {
            self.overwrite(rest, now_ms);
            self.consecutive_failures = 0;
            return true;
        }

        if rest_side.is_flat() && !self.state.side.is_flat() {
            warn!(
                local_side = %self.state.side,
                local_size = %self.state.size,
                "exchange reports flat while local has a position, trusting exchange"
            );
            self.overwrite(rest, now_ms);
            self.consecutive_failures = 0;
            return true;
        }

        if !rest_side.is_flat() && self.state.side.is_flat() {
            warn!(
                rest_side = %rest_side,
                rest_size = %rest_size,
                "exchange reports a position while local is flat, adopting it"
            );
            self.overwrite(rest, now_ms);
            self.consecutive_failures = 0;
            return true;
        }

        self.consecutive_failures += 1;
        warn!(
            failures = self.consecutive_failures,
            local_side = %self.state.side,
            local_size = %self.state.size,
            rest_side = %rest_side,
            rest_size = %rest_size,
            rest_entry = %rest.entry_price,
            local_entry = %self.state.avg_entry,
            "position reconciliation failed"
        );
        false
    }

    fn overwrite(&mut self, rest: &ExchangePosition, now_ms: i64) {
        self.state.side = rest.side();
        self.state.size = rest.size();
        self.state.avg_entry = rest.entry_price;
        self.state.unrealized_pnl = rest.unrealized_pnl;
        self.state.last_update_ms = now_ms;
        debug!(
            side = %self.state.side,
            size = %self.state.size,
            entry = %self.state.avg_entry,
            "local position updated from exchange"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest(amt: Decimal, entry: Decimal) -> ExchangePosition {
        ExchangePosition {
            symbol: "BTCUSDT".to_string(),
            position_amt: amt,
            entry_price: entry,
            mark_price: entry,
            unrealized_pnl: Decimal::ZERO,
            leverage: 10,
        }
    }

    #[test]
    fn test_exchange_position_side() {
        assert_eq!(rest(dec!(1), dec!(100)).side(), PositionSide::Long);
        assert_eq!(rest(dec!(-1), dec!(100)).side(), PositionSide::Short);
        assert_eq!(rest(dec!(0), dec!(0)).side(), PositionSide::Flat);
        assert_eq!(rest(dec!(-2.5), dec!(100)).size(), dec!(2.5));
    }

    #[test]
    fn test_both_flat_reconciles() {
        let mut manager = PositionStateManager::new();
        assert!(manager.update_from_rest(&rest(dec!(0), dec!(0)), 1000));
        assert_eq!(manager.consecutive_failures(), 0);
    }

    #[test]
    fn test_matching_position_reconciles() {
        let mut manager = PositionStateManager::new();
        manager.apply_local_entry(PositionSide::Long, dec!(0.5), dec!(50000), 1000);

        assert!(manager.update_from_rest(&rest(dec!(0.5), dec!(50000)), 2000));
        assert_eq!(manager.state().side, PositionSide::Long);
        assert_eq!(manager.state().last_update_ms, 2000);
    }

    #[test]
    fn test_entry_price_within_one_percent_matches() {
        let mut manager = PositionStateManager::new();
        manager.apply_local_entry(PositionSide::Long, dec!(0.5), dec!(50000), 1000);

        // 0.8 % away: inside tolerance.
        assert!(manager.update_from_rest(&rest(dec!(0.5), dec!(50400)), 2000));
        assert_eq!(manager.state().avg_entry, dec!(50400));
    }

    #[test]
    fn test_zero_exchange_entry_price_matches_anything() {
        let mut manager = PositionStateManager::new();
        manager.apply_local_entry(PositionSide::Long, dec!(0.5), dec!(50000), 1000);

        let mut snapshot = rest(dec!(0.5), dec!(0));
        snapshot.unrealized_pnl = dec!(12);
        assert!(manager.update_from_rest(&snapshot, 2000));
        assert_eq!(manager.state().unrealized_pnl, dec!(12));
    }

    #[test]
    fn test_override_exchange_flat_wins() {
        // Local is long 100 but the exchange says flat: trust the exchange,
        // reset the failure counter.
        let mut manager = PositionStateManager::new();
        manager.apply_local_entry(PositionSide::Long, dec!(100), dec!(50000), 1000);
        manager.set_pending_order("order-1");

        assert!(manager.update_from_rest(&rest(dec!(0), dec!(0)), 2000));
        assert_eq!(manager.state().side, PositionSide::Flat);
        assert_eq!(manager.state().size, Decimal::ZERO);
        assert_eq!(manager.consecutive_failures(), 0);
    }

    #[test]
    fn test_override_exchange_position_adopted_when_local_flat() {
        let mut manager = PositionStateManager::new();

        assert!(manager.update_from_rest(&rest(dec!(-0.25), dec!(48000)), 1000));
        assert_eq!(manager.state().side, PositionSide::Short);
        assert_eq!(manager.state().size, dec!(0.25));
        assert_eq!(manager.state().avg_entry, dec!(48000));
    }

    #[test]
    fn test_divergence_counts_failures_and_freezes() {
        let mut manager = PositionStateManager::new();
        manager.apply_local_entry(PositionSide::Long, dec!(1), dec!(50000), 1000);

        // Same side, wildly different size and entry: a real divergence.
        assert!(!manager.update_from_rest(&rest(dec!(3), dec!(60000)), 2000));
        assert_eq!(manager.consecutive_failures(), 1);
        assert!(!manager.should_freeze());

        assert!(!manager.update_from_rest(&rest(dec!(3), dec!(60000)), 3000));
        assert_eq!(manager.consecutive_failures(), 2);
        assert!(manager.should_freeze());

        // Local state stays untouched on failure.
        assert_eq!(manager.state().size, dec!(1));
    }

    #[test]
    fn test_success_resets_failure_counter() {
        let mut manager = PositionStateManager::new();
        manager.apply_local_entry(PositionSide::Long, dec!(1), dec!(50000), 1000);

        assert!(!manager.update_from_rest(&rest(dec!(3), dec!(60000)), 2000));
        assert!(manager.update_from_rest(&rest(dec!(1), dec!(50000)), 3000));
        assert_eq!(manager.consecutive_failures(), 0);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut manager = PositionStateManager::new();
        manager.apply_local_entry(PositionSide::Long, dec!(1), dec!(50000), 1000);

        let snapshot = rest(dec!(1), dec!(50000));
        assert!(manager.update_from_rest(&snapshot, 2000));
        let side = manager.state().side;
        let size = manager.state().size;
        let entry = manager.state().avg_entry;

        assert!(manager.update_from_rest(&snapshot, 3000));
        assert_eq!(manager.state().side, side);
        assert_eq!(manager.state().size, size);
        assert_eq!(manager.state().avg_entry, entry);
        assert_eq!(manager.consecutive_failures(), 0);
    }

    #[test]
    fn test_pending_order_bookkeeping() {
        let mut manager = PositionStateManager::new();
        assert!(manager.pending_order().is_none());

        manager.set_pending_order("order-42");
        assert_eq!(manager.pending_order(), Some("order-42"));

        manager.clear_pending_order();
        assert!(manager.pending_order().is_none());
    }
}
