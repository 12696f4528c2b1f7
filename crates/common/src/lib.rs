//! Shared plumbing: environment selection, backoff, logging, clock.

mod backoff;
mod environment;
mod logging;

pub use backoff::Backoff;
pub use environment::{BinanceEnvironment, ParseEnvironmentError};
pub use logging::init_logging;

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
