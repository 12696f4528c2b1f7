//! Durable state for the bot: warm-state snapshots and the CSV trade log.
//!
//! Warm-state writes are atomic (temp file + rename) so a crash mid-write
//! can never corrupt the last good snapshot. The trade log is append-only;
//! partial-write damage is confined to the final line.

mod error;
mod trade_log;
mod warm;

pub use error::PersistenceError;
pub use trade_log::TradeLogWriter;
pub use warm::{load_warm_state, save_warm_state, WarmState, WARM_STATE_MAX_AGE_MS};
