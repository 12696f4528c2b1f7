//! Strategy engine implementations.
//!
//! Two engines drive the bot:
//!
//! - [`TrendEngine`]: edge-triggered triple-EMA stack with an RSI filter.
//! - [`HybridEngine`]: a slow trend/bias system (V1) layered with a
//!   momentum-surge system (V2), an RSI/volume exit detector, and an
//!   ADX market-regime gate.

mod hybrid;
mod trend;

pub use hybrid::{HybridConfig, HybridEngine};
pub use trend::{TrendConfig, TrendEngine};
