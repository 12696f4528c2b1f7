//! The trading-bot orchestrator.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use bars::BarBuilder;
use connector_core::EventReceiver;
use execution_core::{
    CloseReason, ExchangeSnapshot, Executor, LocalPosition, OrderTracker, PositionStateManager,
    TradeInstruction,
};
use metrics::SharedMetrics;
use model::{MarketEvent, PositionSide, SyntheticBar, Tick};
use persistence::{load_warm_state, save_warm_state, TradeLogWriter, WarmState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategies::{HybridEngine, TrendEngine};
use strategy_core::{Direction, ExitReason, Signal, SignalEngine};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use trade_stats::TradeStats;

use crate::config::{
    BotConfig, StrategyKind, FREEZE_DURATION_MS, MAX_PROCESSED_SIGNALS, MIN_HOLD_BARS, WARMUP_BARS,
};
use crate::error::BotError;
use crate::events::BotEvents;
use crate::flip::FlipBudget;

/// Trailing stop arms once peak unrealized profit exceeds this percent.
const TRAILING_ACTIVATION_PCT: Decimal = dec!(0.5);

/// Retrace from the best-seen price that triggers the trailing stop.
const TRAILING_DISTANCE_PCT: Decimal = dec!(0.5);

/// Floor and ceiling for dynamically sized orders.
const MIN_ORDER_SIZE: Decimal = dec!(5);
const MAX_ORDER_SIZE: Decimal = dec!(500);

/// Fraction of the theoretical maximum actually deployed when sizing from
/// the balance.
const BALANCE_SIZING_HAIRCUT: Decimal = dec!(0.7);

/// Drives the full signal-and-state pipeline for one instrument.
///
/// The bot owns every piece of mutable pipeline state and consumes both
/// input channels from a single task, so bar closes, protective exits,
/// signal application and executor calls are strictly serialized.
pub struct TradingBot {
    config: BotConfig,
    engine: Box<dyn SignalEngine>,
    executor: Arc<dyn Executor>,
    events: BotEvents,
    metrics: SharedMetrics,

    bar_builder: BarBuilder,
    position_manager: PositionStateManager,
    order_tracker: OrderTracker,
    trade_stats: TradeStats,
    flip_budget: FlipBudget,
    trade_log: Option<TradeLogWriter>,

    position: LocalPosition,
    usdt_balance: Decimal,
    bar_count: u64,
    last_bar_close_ms: i64,
    position_opened_at_bar: u64,
    freeze_until_ms: Option<i64>,
    highest_price: Option<Decimal>,
    lowest_price: Option<Decimal>,
    processed_signals: VecDeque<String>,
    processed_set: HashSet<String>,
}

impl TradingBot {
    /// Build a bot from its configuration.
    ///
    /// # Errors
    /// Fails on invalid configuration or engine parameters.
    pub fn new(
        config: BotConfig,
        executor: Arc<dyn Executor>,
        metrics: SharedMetrics,
    ) -> Result<Self, BotError> {
        config.validate()?;

        let engine: Box<dyn SignalEngine> = match config.strategy {
            StrategyKind::Trend => Box::new(TrendEngine::new(config.trend.clone())?),
            StrategyKind::Hybrid => Box::new(HybridEngine::new(config.hybrid.clone())?),
        };

        Ok(Self {
            bar_builder: BarBuilder::new(config.timeframe_ms),
            flip_budget: FlipBudget::new(config.max_flips_per_hour),
            trade_log: config.trade_log_path.clone().map(TradeLogWriter::new),
            engine,
            executor,
            events: BotEvents::new(),
            metrics,
            position_manager: PositionStateManager::new(),
            order_tracker: OrderTracker::new(),
            trade_stats: TradeStats::new(),
            position: LocalPosition::flat(),
            usdt_balance: Decimal::ZERO,
            bar_count: 0,
            last_bar_close_ms: 0,
            position_opened_at_bar: 0,
            freeze_until_ms: None,
            highest_price: None,
            lowest_price: None,
            processed_signals: VecDeque::new(),
            processed_set: HashSet::new(),
            config,
        })
    }

    pub fn events(&self) -> &BotEvents {
        &self.events
    }

    pub fn trade_stats(&self) -> &TradeStats {
        &self.trade_stats
    }

    /// Run until shutdown. Consumes market events and exchange snapshots
    /// from their channels; emits `stop` when the loop ends.
    pub async fn run(
        mut self,
        mut market_rx: EventReceiver,
        mut snapshot_rx: mpsc::Receiver<ExchangeSnapshot>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(
            symbol = %self.config.symbol,
            strategy = %self.config.strategy,
            timeframe_ms = self.config.timeframe_ms,
            live_trading = self.config.live_trading,
            "starting trading bot"
        );
        self.start();

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received");
                        break;
                    }
                }

                Some(snapshot) = snapshot_rx.recv() => {
                    self.handle_snapshot(snapshot).await;
                }

                Some(event) = market_rx.recv() => {
                    self.handle_market_event(event).await;
                }

                else => {
                    warn!("all input channels closed");
                    break;
                }
            }
        }

        self.events.emit_stop();
        info!("trading bot stopped");
    }

    /// Warm-state restore. Missing, unreadable or stale state starts cold.
    fn start(&mut self) {
        let Some(path) = self.config.warm_state_path.clone() else {
            return;
        };
        let Some(warm) = load_warm_state(&path, common::now_ms()) else {
            return;
        };

        self.last_bar_close_ms = warm.last_bar_close_ms;
        if !warm.position.is_flat() {
            let entry = warm.position.entry_price.unwrap_or_default();
            self.position_manager.apply_local_entry(
                warm.position.side,
                warm.position.size,
                entry,
                common::now_ms(),
            );
            self.engine.position_changed(warm.position.side);
        }
        self.position = warm.position;

        info!(
            side = %self.position.side,
            size = %self.position.size,
            last_bar_close_ms = self.last_bar_close_ms,
            "resumed from warm state"
        );
    }

    async fn handle_market_event(&mut self, event: MarketEvent) {
        let MarketEvent::Tick(tick) = event;
        self.handle_tick(tick).await;
    }

    async fn handle_tick(&mut self, tick: Tick) {
        if tick.symbol != self.config.symbol {
            return;
        }

        if let Some(bar) = self.bar_builder.push_tick(&tick) {
            self.metrics.inc_bars_closed();
            // Protective exits always run before signal logic on a bar.
            self.check_protective_exits(&bar).await;
            self.handle_bar_close(bar).await;
        }
    }

    async fn handle_bar_close(&mut self, bar: SyntheticBar) {
        // Monotonic gate: replays and duplicates are no-ops.
        if bar.end_time_ms <= self.last_bar_close_ms {
            debug!(
                bar_end = bar.end_time_ms,
                last = self.last_bar_close_ms,
                "stale bar ignored"
            );
            return;
        }
        self.last_bar_close_ms = bar.end_time_ms;
        self.bar_count += 1;

        // Warmup gate.
        if self.bar_count <= WARMUP_BARS {
            if self.bar_count == 1 {
                info!(warmup_bars = WARMUP_BARS, "warmup started");
            }
            if self.bar_count == WARMUP_BARS {
                info!("warmup complete, trading enabled from the next bar");
            }
            return;
        }

        // Freeze gate.
        if let Some(until) = self.freeze_until_ms {
            if common::now_ms() < until {
                debug!("trading frozen, skipping bar");
                return;
            }
            self.freeze_until_ms = None;
            info!("trading freeze lifted");
        }

        let evaluation = self.engine.evaluate(&bar);

        // Exit-first: a firing exit consumes the bar.
        if !self.position.is_flat() {
            if let Some(exit) = evaluation.exit {
                info!(reason = %exit, "strategy exit");
                self.close_position(close_reason_for_exit(exit), Some(bar.close))
                    .await;
                return;
            }
        }

        let Some(signal) = evaluation.signal else {
            return;
        };

        if self.is_duplicate_signal(&signal.dedup_key()) {
            debug!(key = %signal.dedup_key(), "duplicate signal skipped");
            return;
        }

        self.metrics.inc_signals_emitted();
        info!(
            direction = %signal.direction,
            reason = %signal.reason,
            price = %signal.price,
            "signal"
        );
        self.events.emit_signal(signal.clone());
        self.events
            .emit_log(format!("signal {} {}", signal.direction, signal.reason));

        self.apply_signal(&signal).await;
    }

    /// Record a signal key; true when it was already seen. The set is
    /// bounded FIFO.
    fn is_duplicate_signal(&mut self, key: &str) -> bool {
        if self.processed_set.contains(key) {
            return true;
        }
        self.processed_set.insert(key.to_string());
        self.processed_signals.push_back(key.to_string());
        if self.processed_signals.len() > MAX_PROCESSED_SIGNALS {
            if let Some(evicted) = self.processed_signals.pop_front() {
                self.processed_set.remove(&evicted);
            }
        }
        false
    }

    async fn apply_signal(&mut self, signal: &Signal) {
        // Market-regime gate (engines without a regime opinion always pass).
        if self.config.require_trending_market
            && !self.engine.regime_allows(self.config.adx_threshold)
        {
            info!("signal skipped, market regime not trending");
            return;
        }

        let side = match signal.direction {
            Direction::Long => PositionSide::Long,
            Direction::Short => PositionSide::Short,
        };

        if side == self.position.side {
            debug!(%side, "same-side signal ignored");
            return;
        }

        let now = common::now_ms();
        if !self.flip_budget.allows(now) {
            warn!(
                used = self.flip_budget.used(),
                max = self.config.max_flips_per_hour,
                "Flip budget exhausted"
            );
            return;
        }

        if !self.position.is_flat() {
            let held = self.bar_count.saturating_sub(self.position_opened_at_bar);
            if held < MIN_HOLD_BARS {
                info!(held, min = MIN_HOLD_BARS, "flip rejected, minimum hold not met");
                return;
            }

            let reason = match side {
                PositionSide::Long => CloseReason::FlipLong,
                _ => CloseReason::FlipShort,
            };
            self.close_position(reason, Some(signal.price)).await;
        }

        let order = TradeInstruction {
            side,
            size: self.order_size(),
            leverage: self.config.max_leverage,
            price: signal.price,
            signal_reason: signal.reason.as_str().to_string(),
            timestamp_ms: now,
        };
        self.enter_position(order).await;
    }

    /// Order size in effect: dynamic balance-based sizing when configured,
    /// the fixed maximum otherwise.
    fn order_size(&self) -> Decimal {
        match self.config.position_size_pct {
            Some(pct) => {
                let dynamic = self.usdt_balance * pct / dec!(100)
                    * BALANCE_SIZING_HAIRCUT
                    * Decimal::from(self.config.max_leverage);
                dynamic
                    .min(self.config.max_position_size)
                    .clamp(MIN_ORDER_SIZE, MAX_ORDER_SIZE)
            }
            None => self.config.max_position_size,
        }
    }

    async fn enter_position(&mut self, order: TradeInstruction) {
        let side = order.side;

        // Balance check is skipped in dry-run mode.
        if self.config.live_trading {
            let required = order.required_margin();
            if self.usdt_balance < required {
                warn!(
                    balance = %self.usdt_balance,
                    required = %required,
                    "insufficient balance for entry, skipping signal"
                );
                return;
            }
        }

        let result = match side {
            PositionSide::Long => self.executor.enter_long(&order).await,
            PositionSide::Short => self.executor.enter_short(&order).await,
            PositionSide::Flat => return,
        };
        if let Err(e) = result {
            if e.is_balance_related() {
                warn!(error = %e, "entry rejected for balance, skipping signal");
            } else {
                error!(error = %e, "entry failed");
            }
            return;
        }

        let now = order.timestamp_ms;
        let order_id = format!("order-{now}");
        self.order_tracker
            .track_order(order_id.clone(), side, order.size, order.price, now);
        self.position_manager.set_pending_order(order_id.clone());

        // Optimistic local position; the poller confirms it shortly.
        self.position = LocalPosition {
            side,
            size: order.size,
            entry_price: Some(order.price),
            opened_at_ms: Some(now),
        };
        self.position_manager
            .apply_local_entry(side, order.size, order.price, now);
        self.position_opened_at_bar = self.bar_count;
        self.highest_price = None;
        self.lowest_price = None;
        self.engine.position_changed(side);
        self.trade_stats
            .start_trade(side, order.price, order.size, order.leverage, now);
        self.flip_budget.record(now);

        info!(
            %side,
            size = %order.size,
            price = %order.price,
            reason = %order.signal_reason,
            order_id = %order_id,
            "position opened"
        );
        self.events.emit_position(self.position.clone());
        self.events
            .emit_log(format!("position opened {side} {}", order.size));
        self.save_warm_state();
    }

    async fn close_position(&mut self, reason: CloseReason, price_hint: Option<Decimal>) {
        if self.position.is_flat() {
            return;
        }

        let side = self.position.side;
        let size = self.position.size;
        let exit_price = price_hint
            .or(self.position.entry_price)
            .unwrap_or_default();

        if let Err(e) = self
            .executor
            .close_position(side, size, exit_price, reason)
            .await
        {
            // The exchange may still hold the position; reconciliation will
            // re-adopt it if so.
            error!(error = %e, reason = %reason, "close order failed");
        }

        let now = common::now_ms();
        if let Some(record) = self.trade_stats.close_trade(exit_price, reason.as_str(), now) {
            info!(
                id = record.id,
                %side,
                entry = %record.entry_price,
                exit = %record.exit_price,
                pnl = %record.pnl,
                pnl_pct = %record.pnl_pct,
                reason = %record.reason,
                duration_min = record.duration_minutes(),
                "trade closed"
            );
            if let Some(log) = &self.trade_log {
                if let Err(e) = log.append(&record) {
                    warn!(error = %e, "failed to append trade to CSV log");
                }
            }
        }

        self.engine.position_changed(PositionSide::Flat);
        self.highest_price = None;
        self.lowest_price = None;
        self.position = LocalPosition::flat();
        self.position_manager.apply_local_flat(now);

        self.events.emit_position(self.position.clone());
        self.events
            .emit_log(format!("position closed ({})", reason.as_str()));
        self.save_warm_state();
    }

    /// Protective exits, in priority order: trailing stop (hybrid only),
    /// emergency stop, regular stop-loss, take-profit.
    async fn check_protective_exits(&mut self, bar: &SyntheticBar) {
        if self.position.is_flat() {
            return;
        }
        let Some(entry) = self.position.entry_price else {
            return;
        };
        let close = bar.close;
        let side = self.position.side;

        // Track the best price seen since entry.
        match side {
            PositionSide::Long => {
                if self.highest_price.is_none_or(|h| close > h) {
                    self.highest_price = Some(close);
                }
            }
            PositionSide::Short => {
                if self.lowest_price.is_none_or(|l| close < l) {
                    self.lowest_price = Some(close);
                }
            }
            PositionSide::Flat => return,
        }

        // 1. Trailing stop, hybrid only, once in enough profit.
        if self.config.strategy == StrategyKind::Hybrid {
            let triggered = match side {
                PositionSide::Long => self.highest_price.is_some_and(|high| {
                    let peak_profit_pct = (high - entry) / entry * dec!(100);
                    peak_profit_pct > TRAILING_ACTIVATION_PCT
                        && close <= high * (Decimal::ONE - TRAILING_DISTANCE_PCT / dec!(100))
                }),
                PositionSide::Short => self.lowest_price.is_some_and(|low| {
                    let peak_profit_pct = (entry - low) / entry * dec!(100);
                    peak_profit_pct > TRAILING_ACTIVATION_PCT
                        && close >= low * (Decimal::ONE + TRAILING_DISTANCE_PCT / dec!(100))
                }),
                PositionSide::Flat => false,
            };
            if triggered {
                self.close_position(CloseReason::TrailingStop, Some(close)).await;
                return;
            }
        }

        // 2. Emergency stop: always armed for hybrid, otherwise with the
        // regular stop-loss switch.
        if self.config.strategy == StrategyKind::Hybrid || self.config.use_stop_loss {
            if breached_stop(side, close, entry, self.config.emergency_stop_pct) {
                self.close_position(CloseReason::EmergencyStop, Some(close)).await;
                return;
            }
        }

        // 3. Regular stop-loss.
        if self.config.use_stop_loss
            && self.config.stop_loss_pct > Decimal::ZERO
            && breached_stop(side, close, entry, self.config.stop_loss_pct)
        {
            self.close_position(CloseReason::StopLoss, Some(close)).await;
            return;
        }

        // 4. Take-profit.
        if self.config.take_profit_pct > Decimal::ZERO {
            let pct = self.config.take_profit_pct / dec!(100);
            let hit = match side {
                PositionSide::Long => close >= entry * (Decimal::ONE + pct),
                PositionSide::Short => close <= entry * (Decimal::ONE - pct),
                PositionSide::Flat => false,
            };
            if hit {
                self.close_position(CloseReason::TakeProfit, Some(close)).await;
            }
        }
    }

    async fn handle_snapshot(&mut self, snapshot: ExchangeSnapshot) {
        match snapshot {
            ExchangeSnapshot::Balance { available, total } => {
                debug!(%available, %total, "balance snapshot");
                self.usdt_balance = available;
            }
            ExchangeSnapshot::Position(position) => {
                let now = common::now_ms();

                // Order expiry rides the reconciliation cadence.
                let expired = self.order_tracker.purge_expired(now);
                if expired
                    .iter()
                    .any(|id| self.position_manager.pending_order() == Some(id.as_str()))
                {
                    self.position_manager.clear_pending_order();
                }

                if self.position_manager.update_from_rest(&position, now) {
                    self.apply_reconciled_state(now);
                } else {
                    self.metrics.inc_reconcile_failures();
                    if self.position_manager.should_freeze() {
                        let until = now + FREEZE_DURATION_MS;
                        if self.freeze_until_ms.is_none() {
                            warn!(
                                freeze_ms = FREEZE_DURATION_MS,
                                "repeated reconciliation divergence, freezing trading"
                            );
                            self.events.emit_log("trading frozen after reconciliation divergence".to_string());
                        }
                        self.freeze_until_ms = Some(until);
                    }
                }
                self.save_warm_state();
            }
        }
    }

    /// Fold a successfully reconciled exchange state back into the bot's
    /// own position view.
    fn apply_reconciled_state(&mut self, now_ms: i64) {
        let state = self.position_manager.state().clone();

        if state.side.is_flat() {
            self.position_manager.clear_pending_order();
            if !self.position.is_flat() {
                warn!("position closed externally, adopting flat state");
                self.engine.position_changed(PositionSide::Flat);
                self.highest_price = None;
                self.lowest_price = None;
                self.position = LocalPosition::flat();
                self.events.emit_position(self.position.clone());
            }
            return;
        }

        // Confirm the pending order the observed position matches.
        if let Some(order_id) =
            self.order_tracker
                .confirm_by_position_change(state.side, state.size, now_ms)
        {
            debug!(%order_id, "pending order confirmed by exchange position");
            if self.position_manager.pending_order() == Some(order_id.as_str()) {
                self.position_manager.clear_pending_order();
            }
        }

        if self.position.side != state.side {
            // Bot restart, or a position opened outside the bot.
            warn!(side = %state.side, size = %state.size, "adopting externally opened position");
            self.engine.position_changed(state.side);
            self.position_opened_at_bar = self.bar_count;
            self.highest_price = None;
            self.lowest_price = None;
            self.position.opened_at_ms = Some(now_ms);
            self.events.emit_position(LocalPosition {
                side: state.side,
                size: state.size,
                entry_price: Some(state.avg_entry),
                opened_at_ms: Some(now_ms),
            });
        }

        self.position.side = state.side;
        self.position.size = state.size;
        self.position.entry_price = Some(state.avg_entry);
        if self.position.opened_at_ms.is_none() {
            self.position.opened_at_ms = Some(now_ms);
        }
    }

    fn save_warm_state(&self) {
        let Some(path) = &self.config.warm_state_path else {
            return;
        };
        let state = WarmState {
            position: self.position.clone(),
            last_bar_close_ms: self.last_bar_close_ms,
            saved_at_ms: common::now_ms(),
        };
        if let Err(e) = save_warm_state(path, &state) {
            warn!(error = %e, "failed to save warm state");
        }
    }
}

fn close_reason_for_exit(exit: ExitReason) -> CloseReason {
    match exit {
        ExitReason::RsiReversal => CloseReason::RsiReversal,
        ExitReason::RsiFlatteningVolumeDrop => CloseReason::RsiFlatteningVolumeDrop,
    }
}

fn breached_stop(side: PositionSide, close: Decimal, entry: Decimal, pct: Decimal) -> bool {
    let pct = pct / dec!(100);
    match side {
        PositionSide::Long => close <= entry * (Decimal::ONE - pct),
        PositionSide::Short => close >= entry * (Decimal::ONE + pct),
        PositionSide::Flat => false,
    }
}
