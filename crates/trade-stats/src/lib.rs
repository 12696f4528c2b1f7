//! Per-trade PnL accounting and rolling performance metrics.

use model::PositionSide;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A trade that has been opened but not yet closed.
#[derive(Debug, Clone)]
pub struct OpenTrade {
    pub side: PositionSide,
    pub entry_price: Decimal,
    pub size: Decimal,
    pub leverage: u32,
    pub opened_at_ms: i64,
}

/// A completed trade. Append-only once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: u64,
    pub side: PositionSide,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub leverage: u32,
    /// Signed price PnL: `(exit - entry) * size` for longs, inverted for shorts.
    pub pnl: Decimal,
    /// Leverage-scaled percent PnL.
    pub pnl_pct: Decimal,
    pub reason: String,
    pub opened_at_ms: i64,
    pub closed_at_ms: i64,
}

impl TradeRecord {
    pub fn duration_minutes(&self) -> i64 {
        (self.closed_at_ms - self.opened_at_ms) / 60_000
    }
}

/// Aggregate metrics over all closed trades.
#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage of closed trades with positive PnL.
    pub win_rate: f64,
    pub total_pnl: Decimal,
    pub avg_win: Decimal,
    /// Average losing PnL, as a positive magnitude.
    pub avg_loss: Decimal,
    /// Gross profit over gross loss. Infinite with wins and no losses,
    /// zero with no wins.
    pub profit_factor: f64,
    /// Largest peak-to-trough fall of the running PnL.
    pub max_drawdown: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
}

/// Owns the append-only trade history and the currently open trade.
#[derive(Debug, Default)]
pub struct TradeStats {
    next_id: u64,
    open: Option<OpenTrade>,
    records: Vec<TradeRecord>,
}

impl TradeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_trade(&self) -> Option<&OpenTrade> {
        self.open.as_ref()
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    /// Open a pending trade record. An existing open trade is discarded with
    /// a warning (it means a close was never accounted for).
    pub fn start_trade(
        &mut self,
        side: PositionSide,
        entry_price: Decimal,
        size: Decimal,
        leverage: u32,
        now_ms: i64,
    ) {
        if self.open.is_some() {
            warn!("starting a trade while another is open, dropping the stale one");
        }
        self.open = Some(OpenTrade {
            side,
            entry_price,
            size,
            leverage,
            opened_at_ms: now_ms,
        });
    }

    /// Close the open trade at `exit_price`, returning the finished record.
    pub fn close_trade(
        &mut self,
        exit_price: Decimal,
        reason: &str,
        now_ms: i64,
    ) -> Option<TradeRecord> {
        let open = self.open.take()?;

        let price_diff = match open.side {
            PositionSide::Long => exit_price - open.entry_price,
            PositionSide::Short => open.entry_price - exit_price,
            PositionSide::Flat => Decimal::ZERO,
        };
        let pnl = price_diff * open.size;
        let pnl_pct = if open.entry_price.is_zero() {
            Decimal::ZERO
        } else {
            price_diff / open.entry_price * Decimal::from(100) * Decimal::from(open.leverage)
        };

        self.next_id += 1;
        let record = TradeRecord {
            id: self.next_id,
            side: open.side,
            entry_price: open.entry_price,
            exit_price,
            size: open.size,
            leverage: open.leverage,
            pnl,
            pnl_pct,
            reason: reason.to_string(),
            opened_at_ms: open.opened_at_ms,
            closed_at_ms: now_ms,
        };
        self.records.push(record.clone());
        Some(record)
    }

    pub fn summary(&self) -> StatsSummary {
        let total_trades = self.records.len();
        let wins: Vec<&TradeRecord> = self
            .records
            .iter()
            .filter(|r| r.pnl > Decimal::ZERO)
            .collect();
        let losses: Vec<&TradeRecord> = self
            .records
            .iter()
            .filter(|r| r.pnl < Decimal::ZERO)
            .collect();

        let total_pnl: Decimal = self.records.iter().map(|r| r.pnl).sum();
        let gross_profit: Decimal = wins.iter().map(|r| r.pnl).sum();
        let gross_loss: Decimal = losses.iter().map(|r| -r.pnl).sum();

        let avg_win = if wins.is_empty() {
            Decimal::ZERO
        } else {
            gross_profit / Decimal::from(wins.len())
        };
        let avg_loss = if losses.is_empty() {
            Decimal::ZERO
        } else {
            gross_loss / Decimal::from(losses.len())
        };

        let profit_factor = if wins.is_empty() {
            0.0
        } else if losses.is_empty() {
            f64::INFINITY
        } else {
            (gross_profit / gross_loss).to_f64().unwrap_or_default()
        };

        let win_rate = if total_trades == 0 {
            0.0
        } else {
            wins.len() as f64 / total_trades as f64 * 100.0
        };

        let mut running = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;
        for record in &self.records {
            running += record.pnl;
            if running > peak {
                peak = running;
            }
            let drawdown = peak - running;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        let largest_win = wins.iter().map(|r| r.pnl).max().unwrap_or(Decimal::ZERO);
        let largest_loss = losses.iter().map(|r| r.pnl).min().unwrap_or(Decimal::ZERO);

        StatsSummary {
            total_trades,
            wins: wins.len(),
            losses: losses.len(),
            win_rate,
            total_pnl,
            avg_win,
            avg_loss,
            profit_factor,
            max_drawdown,
            largest_win,
            largest_loss,
        }
    }
}
