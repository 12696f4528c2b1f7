//! The signal engine trait.

use model::{PositionSide, SyntheticBar};

use crate::signal::{ExitReason, Signal};

/// Outcome of evaluating one closed bar.
///
/// When `exit` is set the orchestrator closes the position and discards
/// `signal` for that bar; engines therefore never populate both.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub exit: Option<ExitReason>,
    pub signal: Option<Signal>,
}

impl Evaluation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn exit(reason: ExitReason) -> Self {
        Self {
            exit: Some(reason),
            signal: None,
        }
    }

    pub fn signal(signal: Signal) -> Self {
        Self {
            exit: None,
            signal: Some(signal),
        }
    }
}

/// A deterministic strategy engine driven by closed bars.
///
/// Engines own their indicators and edge-tracking flags. All methods are
/// synchronous; the orchestrator serializes calls per instrument.
pub trait SignalEngine: Send {
    /// Short name used in logs ("trend", "hybrid").
    fn name(&self) -> &'static str;

    /// Consume one closed bar, updating internal state, and report the
    /// resulting exit recommendation and/or entry signal.
    fn evaluate(&mut self, bar: &SyntheticBar) -> Evaluation;

    /// Told by the orchestrator whenever the tracked position side changes,
    /// so exit detection can follow the live position.
    fn position_changed(&mut self, _side: PositionSide) {}

    /// Market-regime gate. Engines without a regime opinion always allow.
    fn regime_allows(&self, _adx_threshold: f64) -> bool {
        true
    }
}
