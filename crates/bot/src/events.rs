//! Typed event channels exposed by the bot.
//!
//! One broadcast channel per event kind; subscribers attach before `run`
//! and lagging receivers drop the oldest events rather than blocking the
//! pipeline.

use execution_core::LocalPosition;
use strategy_core::Signal;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// The bot's outbound event channels: `signal`, `position`, `log`, `stop`.
#[derive(Debug)]
pub struct BotEvents {
    signal_tx: broadcast::Sender<Signal>,
    position_tx: broadcast::Sender<LocalPosition>,
    log_tx: broadcast::Sender<String>,
    stop_tx: broadcast::Sender<()>,
}

impl Default for BotEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl BotEvents {
    pub fn new() -> Self {
        Self {
            signal_tx: broadcast::channel(EVENT_CAPACITY).0,
            position_tx: broadcast::channel(EVENT_CAPACITY).0,
            log_tx: broadcast::channel(EVENT_CAPACITY).0,
            stop_tx: broadcast::channel(1).0,
        }
    }

    pub fn subscribe_signals(&self) -> broadcast::Receiver<Signal> {
        self.signal_tx.subscribe()
    }

    pub fn subscribe_positions(&self) -> broadcast::Receiver<LocalPosition> {
        self.position_tx.subscribe()
    }

    pub fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }

    pub fn subscribe_stop(&self) -> broadcast::Receiver<()> {
        self.stop_tx.subscribe()
    }

    // Send errors just mean nobody is listening.

    pub(crate) fn emit_signal(&self, signal: Signal) {
        let _ = self.signal_tx.send(signal);
    }

    pub(crate) fn emit_position(&self, position: LocalPosition) {
        let _ = self.position_tx.send(position);
    }

    pub(crate) fn emit_log(&self, message: String) {
        let _ = self.log_tx.send(message);
    }

    pub(crate) fn emit_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}
