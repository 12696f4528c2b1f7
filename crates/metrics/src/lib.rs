//! Pipeline metrics: feed health plus signal/reconciliation counters.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe counters for the whole tick-to-signal pipeline.
#[derive(Debug)]
pub struct BotMetrics {
    ticks_received: AtomicU64,
    messages_received: AtomicU64,
    parse_errors: AtomicU64,
    websocket_errors: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_successes: AtomicU64,
    bars_closed: AtomicU64,
    signals_emitted: AtomicU64,
    reconcile_failures: AtomicU64,

    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_tick_time: Option<Instant>,
    last_error_time: Option<Instant>,
}

impl Default for BotMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BotMetrics {
    pub fn new() -> Self {
        Self {
            ticks_received: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            websocket_errors: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            reconnect_successes: AtomicU64::new(0),
            bars_closed: AtomicU64::new(0),
            signals_emitted: AtomicU64::new(0),
            reconcile_failures: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_tick_time: None,
                last_error_time: None,
            }),
        }
    }

    pub fn inc_ticks_received(&self) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_tick_time = Some(Instant::now());
    }

    pub fn inc_messages_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_websocket_errors(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnect_successes(&self) {
        self.reconnect_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_bars_closed(&self) {
        self.bars_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_signals_emitted(&self) {
        self.signals_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconcile_failures(&self) {
        self.reconcile_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks_received(&self) -> u64 {
        self.ticks_received.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_tick(&self) -> Option<f64> {
        self.inner
            .read()
            .last_tick_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let ticks_received = self.ticks_received();
        let uptime_secs = self.uptime_secs();
        MetricsSnapshot {
            ticks_received,
            messages_received: self.messages_received.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            websocket_errors: self.websocket_errors.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnect_successes: self.reconnect_successes.load(Ordering::Relaxed),
            bars_closed: self.bars_closed.load(Ordering::Relaxed),
            signals_emitted: self.signals_emitted.load(Ordering::Relaxed),
            reconcile_failures: self.reconcile_failures.load(Ordering::Relaxed),
            uptime_secs,
            ticks_per_second: if uptime_secs > 0.0 {
                ticks_received as f64 / uptime_secs
            } else {
                0.0
            },
            secs_since_last_tick: self.secs_since_last_tick(),
            secs_since_last_error: self
                .inner
                .read()
                .last_error_time
                .map(|t| t.elapsed().as_secs_f64()),
        }
    }
}

/// A point-in-time snapshot of all counters.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub ticks_received: u64,
    pub messages_received: u64,
    pub parse_errors: u64,
    pub websocket_errors: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
    pub bars_closed: u64,
    pub signals_emitted: u64,
    pub reconcile_failures: u64,
    pub uptime_secs: f64,
    pub ticks_per_second: f64,
    pub secs_since_last_tick: Option<f64>,
    pub secs_since_last_error: Option<f64>,
}

/// Coarse pipeline health derived from tick freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    const STALE_THRESHOLD_SECS: f64 = 30.0;
    const UNHEALTHY_THRESHOLD_SECS: f64 = 60.0;

    pub fn health_status(&self) -> HealthStatus {
        let since_tick = match self.secs_since_last_tick {
            Some(secs) => secs,
            // No ticks yet: grade on uptime while the feed warms up.
            None => self.uptime_secs,
        };

        if since_tick > Self::UNHEALTHY_THRESHOLD_SECS {
            HealthStatus::Unhealthy
        } else if since_tick > Self::STALE_THRESHOLD_SECS {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bot Metrics ===")?;
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Ticks received:      {}", self.ticks_received)?;
        writeln!(f, "Messages received:   {}", self.messages_received)?;
        writeln!(f, "Ticks/sec:           {:.2}", self.ticks_per_second)?;
        writeln!(f, "Bars closed:         {}", self.bars_closed)?;
        writeln!(f, "Signals emitted:     {}", self.signals_emitted)?;
        writeln!(f, "Reconcile failures:  {}", self.reconcile_failures)?;
        writeln!(f, "Parse errors:        {}", self.parse_errors)?;
        writeln!(f, "WebSocket errors:    {}", self.websocket_errors)?;
        writeln!(f, "Reconnect attempts:  {}", self.reconnect_attempts)?;
        writeln!(f, "Reconnect successes: {}", self.reconnect_successes)?;
        if let Some(secs) = self.secs_since_last_tick {
            writeln!(f, "Since last tick:     {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_error {
            writeln!(f, "Since last error:    {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<BotMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(BotMetrics::new())
}
